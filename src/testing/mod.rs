use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::directory::{DirectoryError, DirectoryFixture, MemoryDirectory, TenantDirectory};
use crate::models::{Company, CompanyStatus, Identity, MemberRole, MembershipRecord};
use crate::storage::MemoryStore;

pub fn company(id: &str) -> Company {
    Company {
        id: id.to_string(),
        name: format!("Company {}", id),
        slug: id.to_lowercase(),
        logo_url: None,
        status: CompanyStatus::Active,
    }
}

pub fn user(id: &str) -> Identity {
    Identity::new(id, format!("{}@example.com", id))
}

/// Directory with companies A, B, C where
/// u1 is user of A and admin of B, u2 is super admin of C, u3 has nothing
pub fn sample_directory() -> MemoryDirectory {
    MemoryDirectory::new(DirectoryFixture {
        companies: vec![company("A"), company("B"), company("C")],
        members: vec![
            member("u1", "B", MemberRole::Admin),
            member("u1", "A", MemberRole::User),
            member("u2", "C", MemberRole::SuperAdmin),
        ],
    })
}

fn member(user_id: &str, company_id: &str, role: MemberRole) -> crate::directory::memory::MemberRow {
    crate::directory::memory::MemberRow {
        user_id: user_id.to_string(),
        company_id: company_id.to_string(),
        role,
    }
}

pub fn shared_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Directory whose queries for a held user block until released
pub struct GatedDirectory {
    inner: MemoryDirectory,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
}

impl GatedDirectory {
    pub fn new(inner: MemoryDirectory) -> Self {
        Self {
            inner,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Hold the next query for `user_id`; send on the returned sender to release it
    pub fn hold(&self, user_id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(user_id.to_string(), rx);
        tx
    }

    pub fn inner(&self) -> &MemoryDirectory {
        &self.inner
    }
}

#[async_trait]
impl TenantDirectory for GatedDirectory {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn memberships(&self, identity: &Identity) -> Result<Vec<MembershipRecord>, DirectoryError> {
        let gate = self.gates.lock().unwrap().remove(&identity.id);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.inner.memberships(identity).await
    }
}
