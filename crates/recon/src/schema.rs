//! Column alias resolution, done once per dataset at load time.

use log::{debug, info};

use crate::config::{MatchConfig, Role, Side};
use crate::error::ReconError;
use crate::model::{Dataset, Record};

/// Concrete column indices for each role on one dataset.
#[derive(Debug, Clone, Default)]
pub struct ResolvedColumns {
    first_name: Option<usize>,
    last_name: Option<usize>,
    company: Option<usize>,
    email: Option<usize>,
    id: Option<usize>,
    partition: Option<usize>,
}

impl ResolvedColumns {
    /// Resolve every role of `dataset` through its alias list. Roles the
    /// configured strategy needs must resolve; the rest degrade to empty
    /// values per row.
    pub fn resolve(
        dataset: &Dataset,
        side: Side,
        config: &MatchConfig,
    ) -> Result<Self, ReconError> {
        let aliases = &config.dataset(side).columns;
        let required = config.strategy.required_roles();
        let mut resolved = ResolvedColumns::default();

        for role in Role::ALL {
            let tried = aliases.aliases(role, side);
            let idx = first_present(dataset, &tried);
            if idx.is_none() && required.contains(&role) {
                return Err(unresolved(dataset, side, &role.to_string(), tried));
            }
            match idx {
                Some(i) => debug!("{side}: role {role} -> column '{}'", dataset.headers[i]),
                None => debug!("{side}: role {role} unresolved, values treated as empty"),
            }
            resolved.set(role, idx);
        }

        if side == Side::Source {
            if let Some(ref partition) = config.partition {
                let idx = first_present(dataset, &partition.column);
                if idx.is_none() {
                    return Err(unresolved(
                        dataset,
                        side,
                        "partition",
                        partition.column.clone(),
                    ));
                }
                resolved.partition = idx;
            }
        }

        info!(
            "{side} dataset '{}': {} rows, {} columns",
            dataset.name,
            dataset.len(),
            dataset.headers.len()
        );
        Ok(resolved)
    }

    fn set(&mut self, role: Role, idx: Option<usize>) {
        match role {
            Role::FirstName => self.first_name = idx,
            Role::LastName => self.last_name = idx,
            Role::Company => self.company = idx,
            Role::Email => self.email = idx,
            Role::Id => self.id = idx,
        }
    }

    pub fn column(&self, role: Role) -> Option<usize> {
        match role {
            Role::FirstName => self.first_name,
            Role::LastName => self.last_name,
            Role::Company => self.company,
            Role::Email => self.email,
            Role::Id => self.id,
        }
    }

    pub fn value<'r>(&self, record: &'r Record, role: Role) -> Option<&'r str> {
        self.column(role).and_then(|i| record.get(i))
    }

    pub fn partition_value<'r>(&self, record: &'r Record) -> Option<&'r str> {
        self.partition.and_then(|i| record.get(i))
    }
}

fn first_present(dataset: &Dataset, aliases: &[String]) -> Option<usize> {
    aliases.iter().find_map(|a| dataset.column_index(a))
}

fn unresolved(dataset: &Dataset, side: Side, role: &str, tried: Vec<String>) -> ReconError {
    ReconError::UnresolvedRole {
        role: role.into(),
        dataset: format!("{side} '{}'", dataset.name),
        tried,
        found: dataset.headers.clone(),
    }
}
