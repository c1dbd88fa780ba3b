use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::AccessConfig;
use crate::errors::{RagError, Result};

/// Capabilities attached to a role beyond its department memberships
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleProfile {
    /// Reads every document regardless of its allowed-role set
    pub bypass_filter: bool,
    /// May register documents after start-up
    pub can_ingest: bool,
}

/// Static department -> roles mapping with one universal department.
///
/// Pure function of configuration: lookups never mutate, and an unknown
/// department is rejected at ingestion time rather than at query time.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    universal: String,
    departments: BTreeMap<String, BTreeSet<String>>,
    profiles: HashMap<String, RoleProfile>,
}

impl AccessPolicy {
    /// Build a policy from configuration, checking its invariants
    pub fn from_config(config: &AccessConfig) -> Result<Self> {
        let policy = Self::build(config);
        policy.validate()?;
        Ok(policy)
    }

    fn build(config: &AccessConfig) -> Self {
        let departments = config
            .departments
            .iter()
            .map(|(dept, roles)| (dept.clone(), roles.iter().cloned().collect()))
            .collect();

        let profiles = config
            .roles
            .iter()
            .map(|r| {
                (
                    r.name.clone(),
                    RoleProfile {
                        bypass_filter: r.bypass_filter,
                        can_ingest: r.can_ingest,
                    },
                )
            })
            .collect();

        Self {
            universal: config.universal.clone(),
            departments,
            profiles,
        }
    }

    fn validate(&self) -> Result<()> {
        let universal_roles = self.departments.get(&self.universal).ok_or_else(|| {
            RagError::PolicyError(format!(
                "universal department '{}' has no role mapping",
                self.universal
            ))
        })?;

        for (dept, roles) in &self.departments {
            if dept.trim().is_empty() {
                return Err(RagError::PolicyError("empty department name".to_string()));
            }
            if roles.is_empty() {
                return Err(RagError::PolicyError(format!(
                    "department '{}' grants no roles",
                    dept
                )));
            }
            if let Some(missing) = roles.iter().find(|r| !universal_roles.contains(*r)) {
                return Err(RagError::PolicyError(format!(
                    "role '{}' reads '{}' but not universal department '{}'",
                    missing, dept, self.universal
                )));
            }
        }

        if let Some(missing) = self.profiles.keys().find(|r| !universal_roles.contains(*r)) {
            return Err(RagError::PolicyError(format!(
                "role '{}' has capabilities but no access to '{}'",
                missing, self.universal
            )));
        }

        Ok(())
    }

    /// Roles allowed to read documents of `department`
    pub fn allowed_roles(&self, department: &str) -> Result<BTreeSet<String>> {
        self.departments
            .get(department)
            .cloned()
            .ok_or_else(|| RagError::InvalidDepartment {
                department: department.to_string(),
                known: self.departments().map(str::to_string).collect(),
            })
    }

    pub fn is_known_department(&self, department: &str) -> bool {
        self.departments.contains_key(department)
    }

    pub fn is_universal(&self, department: &str) -> bool {
        department == self.universal
    }

    pub fn universal(&self) -> &str {
        &self.universal
    }

    /// Known departments in sorted order
    pub fn departments(&self) -> impl Iterator<Item = &str> {
        self.departments.keys().map(String::as_str)
    }

    /// Every role the policy knows (the universal department's readers)
    pub fn roles(&self) -> BTreeSet<&str> {
        self.departments
            .get(&self.universal)
            .map(|roles| roles.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Capability profile; roles without one get no capabilities
    pub fn profile(&self, role: &str) -> RoleProfile {
        self.profiles.get(role).copied().unwrap_or_default()
    }

    pub fn bypasses_filter(&self, role: &str) -> bool {
        self.profile(role).bypass_filter
    }

    pub fn can_ingest(&self, role: &str) -> bool {
        self.profile(role).can_ingest
    }

    /// Departments whose documents `role` may read by membership
    pub fn departments_for(&self, role: &str) -> Vec<&str> {
        self.departments
            .iter()
            .filter(|(_, roles)| roles.contains(role))
            .map(|(dept, _)| dept.as_str())
            .collect()
    }

    /// Access decision against a document's stored allowed-role set
    pub fn can_read(&self, role: &str, allowed_roles: &BTreeSet<String>) -> bool {
        self.bypasses_filter(role) || allowed_roles.contains(role)
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::build(&AccessConfig::default())
    }
}
