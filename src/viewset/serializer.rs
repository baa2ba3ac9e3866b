//! # Serialization
//!
//! Renders entities into hypermedia envelopes: an absolute `href` followed
//! by the attributes the entity's descriptor declares, then one link per
//! declared relation.
//!
//! Only directly mapped attributes are rendered. Computed values are not
//! part of the default output; a wrapping viewset adds them to the
//! envelope returned by `retrieve_envelope`/`list_envelope`.

use serde_json::{Map, Value};

use crate::core::{RequestContext, ViewsetError, ViewsetResult};

use super::manager::{Entity, ModelDescriptor, HREF_FIELD};

/// Data handed to a serializer, tagged by cardinality
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<E> {
    Single(E),
    Collection(Vec<E>),
}

impl<E> Payload<E> {
    pub fn is_multiple(&self) -> bool {
        matches!(self, Payload::Collection(_))
    }
}

/// Produces the serialized form of its payload
pub trait ResourceSerializer {
    fn data(&self) -> ViewsetResult<Value>;
}

/// Serializer for one entity
pub struct ModelSerializer<'a, E> {
    instance: E,
    model: &'a ModelDescriptor,
    ctx: &'a RequestContext,
}

impl<'a, E: Entity> ModelSerializer<'a, E> {
    pub fn new(instance: E, model: &'a ModelDescriptor, ctx: &'a RequestContext) -> Self {
        Self {
            instance,
            model,
            ctx,
        }
    }
}

impl<E: Entity> ResourceSerializer for ModelSerializer<'_, E> {
    fn data(&self) -> ViewsetResult<Value> {
        let pk = require_primary_key(&self.instance, self.model)?;
        let href = self.ctx.sibling_url(&pk);
        Ok(Value::Object(envelope(&self.instance, href, self.model)))
    }
}

/// Serializer for an ordered sequence of entities
pub struct ListSerializer<'a, E> {
    instances: Vec<E>,
    model: &'a ModelDescriptor,
    ctx: &'a RequestContext,
}

impl<'a, E: Entity> ListSerializer<'a, E> {
    pub fn new(instances: Vec<E>, model: &'a ModelDescriptor, ctx: &'a RequestContext) -> Self {
        Self {
            instances,
            model,
            ctx,
        }
    }
}

impl<E: Entity> ResourceSerializer for ListSerializer<'_, E> {
    fn data(&self) -> ViewsetResult<Value> {
        let mut results = Vec::with_capacity(self.instances.len());
        for instance in &self.instances {
            let pk = require_primary_key(instance, self.model)?;
            let href = self.ctx.member_url(&pk);
            results.push(Value::Object(envelope(instance, href, self.model)));
        }
        Ok(Value::Array(results))
    }
}

/// Builds the serializer for a payload
pub trait SerializerFactory<E>: Send + Sync {
    fn build<'a>(
        &self,
        payload: Payload<E>,
        model: &'a ModelDescriptor,
        ctx: &'a RequestContext,
    ) -> Box<dyn ResourceSerializer + 'a>
    where
        E: 'a;
}

/// Single payloads get a [`ModelSerializer`], collections a [`ListSerializer`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSerializerFactory;

impl<E: Entity> SerializerFactory<E> for DefaultSerializerFactory {
    fn build<'a>(
        &self,
        payload: Payload<E>,
        model: &'a ModelDescriptor,
        ctx: &'a RequestContext,
    ) -> Box<dyn ResourceSerializer + 'a>
    where
        E: 'a,
    {
        match payload {
            Payload::Single(instance) => Box::new(ModelSerializer::new(instance, model, ctx)),
            Payload::Collection(instances) => Box::new(ListSerializer::new(instances, model, ctx)),
        }
    }
}

fn require_primary_key<E: Entity>(entity: &E, model: &ModelDescriptor) -> ViewsetResult<String> {
    let pk = entity.primary_key();
    if pk.is_empty() {
        return Err(ViewsetError::configuration(format!(
            "model '{}' produced an entity without a primary key",
            model.name
        )));
    }
    Ok(pk)
}

fn envelope<E: Entity>(entity: &E, href: String, model: &ModelDescriptor) -> Map<String, Value> {
    let base = href.trim_end_matches('/').to_string();
    let mut fields = Map::new();
    fields.insert(HREF_FIELD.to_string(), Value::String(href));

    for column in &model.columns {
        if let Some(value) = entity.attribute(column) {
            fields.insert(column.clone(), value);
        }
    }

    for relation in &model.relations {
        fields.insert(relation.clone(), Value::String(format!("{}/{}", base, relation)));
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Ship {
        id: String,
        name: &'static str,
        tonnage: u32,
    }

    impl Entity for Ship {
        fn primary_key(&self) -> String {
            self.id.clone()
        }

        fn attribute(&self, name: &str) -> Option<Value> {
            match name {
                "id" => Some(json!(self.id)),
                "name" => Some(json!(self.name)),
                "tonnage" => Some(json!(self.tonnage)),
                _ => None,
            }
        }
    }

    fn ship(id: &str) -> Ship {
        Ship {
            id: id.to_string(),
            name: "Endurance",
            tonnage: 348,
        }
    }

    fn model() -> ModelDescriptor {
        ModelDescriptor::new("Ship")
            .with_columns(["id", "name", "unmapped"])
            .with_relations(["crew"])
    }

    #[test]
    fn test_single_envelope() {
        let ctx = RequestContext::from_url("http://fleet.local:8000/ships/s1").unwrap();
        let model = model();
        let data = DefaultSerializerFactory
            .build(Payload::Single(ship("s1")), &model, &ctx)
            .data()
            .unwrap();

        assert_eq!(
            data,
            json!({
                "href": "http://fleet.local:8000/ships/s1",
                "id": "s1",
                "name": "Endurance",
                "crew": "http://fleet.local:8000/ships/s1/crew",
            })
        );
    }

    #[test]
    fn test_single_href_is_built_from_primary_key() {
        let ctx = RequestContext::from_url("http://fleet.local/ships/S1").unwrap();
        let model = model();
        let data = DefaultSerializerFactory
            .build(Payload::Single(ship("s1")), &model, &ctx)
            .data()
            .unwrap();

        assert_eq!(data["href"], "http://fleet.local/ships/s1");
        assert_eq!(data["crew"], "http://fleet.local/ships/s1/crew");
    }

    #[test]
    fn test_list_envelopes_keep_order() {
        let ctx = RequestContext::from_url("https://fleet.local/ships?name=x").unwrap();
        let model = model();
        let data = DefaultSerializerFactory
            .build(Payload::Collection(vec![ship("b"), ship("a")]), &model, &ctx)
            .data()
            .unwrap();

        let items = data.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["href"], "https://fleet.local/ships/b");
        assert_eq!(items[1]["href"], "https://fleet.local/ships/a");
        assert_eq!(items[1]["crew"], "https://fleet.local/ships/a/crew");
        assert!(items[0].get("tonnage").is_none());
    }

    #[test]
    fn test_empty_collection() {
        let ctx = RequestContext::from_url("http://h/ships").unwrap();
        let model = model();
        let data = DefaultSerializerFactory
            .build(Payload::<Ship>::Collection(Vec::new()), &model, &ctx)
            .data()
            .unwrap();
        assert_eq!(data, json!([]));
    }

    #[test]
    fn test_missing_primary_key_is_configuration_error() {
        let ctx = RequestContext::from_url("http://h/ships").unwrap();
        let model = model();
        let result = DefaultSerializerFactory
            .build(Payload::Collection(vec![ship("")]), &model, &ctx)
            .data();
        assert!(matches!(result, Err(ViewsetError::Configuration(_))));
    }

    #[test]
    fn test_payload_cardinality() {
        assert!(Payload::<u8>::Collection(vec![]).is_multiple());
        assert!(!Payload::Single(1u8).is_multiple());
    }
}
