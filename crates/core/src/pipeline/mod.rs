pub mod entity_builder;
pub mod recognize_entities_use_case;
