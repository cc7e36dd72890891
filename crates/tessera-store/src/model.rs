//! Per-model storage descriptors.
//!
//! The four stores share one record/chunk layout. A [`Model`] names the tables
//! a store lives in and whether it records field pointers.

use std::fmt;

/// One of the four data models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    Kv,
    Depot,
    Queue,
    Stack,
}

impl Model {
    pub const ALL: [Model; 4] = [Model::Kv, Model::Depot, Model::Queue, Model::Stack];

    pub fn name(self) -> &'static str {
        match self {
            Model::Kv => "kv",
            Model::Depot => "depot",
            Model::Queue => "queue",
            Model::Stack => "stack",
        }
    }

    pub fn record_table(self) -> &'static str {
        match self {
            Model::Kv => "tessera_kv_record",
            Model::Depot => "tessera_depot_record",
            Model::Queue => "tessera_queue_record",
            Model::Stack => "tessera_stack_record",
        }
    }

    pub fn chunk_table(self) -> &'static str {
        match self {
            Model::Kv => "tessera_kv_chunk",
            Model::Depot => "tessera_depot_chunk",
            Model::Queue => "tessera_queue_chunk",
            Model::Stack => "tessera_stack_chunk",
        }
    }

    /// Pointer table, for models that index top-level fields.
    pub fn pointer_table(self) -> Option<&'static str> {
        match self {
            Model::Kv => Some("tessera_kv_pointer"),
            Model::Depot => Some("tessera_depot_pointer"),
            Model::Queue | Model::Stack => None,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_kv_and_depot_index_fields() {
        let indexed: Vec<Model> = Model::ALL
            .into_iter()
            .filter(|m| m.pointer_table().is_some())
            .collect();
        assert_eq!(indexed, vec![Model::Kv, Model::Depot]);
    }

    #[test]
    fn test_table_names_carry_model_name() {
        for model in Model::ALL {
            assert!(model.record_table().contains(model.name()));
            assert!(model.chunk_table().contains(model.name()));
            assert_eq!(model.to_string(), model.name());
        }
    }
}
