//! Exact-type lookup from a runtime type to the serialization that handles it.

use std::{
    any::{type_name, Any, TypeId},
    io::{Read, Write},
    sync::Arc,
};

use indexmap::IndexMap;

use crate::{
    comparator::{BytesComparator, RawComparator},
    error::{SerializationError, SerializationResult},
    primitive::{FloatsSerialization, IntsSerialization},
    record::RecordSerialization,
    schema::{Chunk, DataValue},
    session::{DeserializerSession, SerializerSession},
};

/// Writes values of one type onto a stream. One instance per session.
pub trait Serializer<T>: Send {
    fn serialize(&mut self, out: &mut dyn Write, value: &T) -> SerializationResult<()>;
}

/// Reads values of one type from a stream. One instance per session.
pub trait Deserializer<T>: Send {
    fn deserialize(&mut self, input: &mut dyn Read) -> SerializationResult<T>;
}

/// Factory for the codec instances of one concrete type.
pub trait Serialization<T>: Send + Sync + 'static {
    /// Wire token announcing this type to the host, if it has one.
    fn token(&self) -> Option<u32> {
        None
    }

    fn serializer(&self) -> Box<dyn Serializer<T>>;

    fn deserializer(&self) -> Box<dyn Deserializer<T>>;

    fn comparator(&self) -> Arc<dyn RawComparator> {
        Arc::new(BytesComparator)
    }
}

/// Token and type name pair handed to the host framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializationToken {
    pub token: u32,
    pub type_name: &'static str,
}

struct Registration {
    type_name: &'static str,
    token: Option<u32>,
    /// Holds an `Arc<dyn Serialization<T>>` for the registered `T`.
    serialization: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
pub struct SerializationRegistry {
    registrations: IndexMap<TypeId, Registration>,
    tokens: IndexMap<u32, TypeId>,
}

impl SerializationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the array, chunk and union serializations installed.
    pub fn with_defaults() -> SerializationResult<Self> {
        let mut registry = Self::new();
        registry.register::<Vec<i32>, _>(IntsSerialization::default())?;
        registry.register::<Vec<f32>, _>(FloatsSerialization::default())?;
        registry.register::<Chunk, _>(RecordSerialization::<Chunk>::default())?;
        registry.register::<DataValue, _>(RecordSerialization::<DataValue>::default())?;
        Ok(registry)
    }

    /// Bind `serialization` to `T`, replacing any earlier binding for `T`.
    ///
    /// Fails when the serialization's token already belongs to another type.
    pub fn register<T, S>(&mut self, serialization: S) -> SerializationResult<()>
    where
        T: 'static,
        S: Serialization<T>,
    {
        let type_id = TypeId::of::<T>();
        let token = serialization.token();
        if let Some(token) = token {
            if let Some(existing) = self.tokens.get(&token).filter(|id| **id != type_id) {
                let existing = self
                    .registrations
                    .get(existing)
                    .map(|r| r.type_name)
                    .unwrap_or("<unknown>");
                return Err(SerializationError::TokenConflict {
                    token,
                    existing,
                    requested: type_name::<T>(),
                });
            }
        }

        if let Some(previous) = self.registrations.get(&type_id).and_then(|r| r.token) {
            self.tokens.shift_remove(&previous);
        }
        if let Some(token) = token {
            self.tokens.insert(token, type_id);
        }

        let serialization: Arc<dyn Serialization<T>> = Arc::new(serialization);
        tracing::debug!("Registered serialization for {}", type_name::<T>());
        self.registrations.insert(
            type_id,
            Registration {
                type_name: type_name::<T>(),
                token,
                serialization: Box::new(serialization),
            },
        );
        Ok(())
    }

    pub fn accept<T: 'static>(&self) -> bool {
        self.accept_type_id(TypeId::of::<T>())
    }

    /// Exact match only: no fallback to related types.
    pub fn accept_type_id(&self, type_id: TypeId) -> bool {
        self.registrations.contains_key(&type_id)
    }

    pub fn serialization<T: 'static>(&self) -> SerializationResult<Arc<dyn Serialization<T>>> {
        self.registrations
            .get(&TypeId::of::<T>())
            .and_then(|r| r.serialization.downcast_ref::<Arc<dyn Serialization<T>>>())
            .cloned()
            .ok_or(SerializationError::NotRegistered(type_name::<T>()))
    }

    /// Bind a fresh serializer for `T` to `out`.
    pub fn open_serializer<T: 'static, W: Write>(
        &self,
        out: W,
    ) -> SerializationResult<SerializerSession<T, W>> {
        Ok(SerializerSession::open(self.serialization::<T>()?.serializer(), out))
    }

    /// Bind a fresh deserializer for `T` to `input`.
    pub fn open_deserializer<T: 'static, R: Read>(
        &self,
        input: R,
    ) -> SerializationResult<DeserializerSession<T, R>> {
        Ok(DeserializerSession::open(
            self.serialization::<T>()?.deserializer(),
            input,
        ))
    }

    pub fn comparator<T: 'static>(&self) -> SerializationResult<Arc<dyn RawComparator>> {
        Ok(self.serialization::<T>()?.comparator())
    }

    pub fn token_for<T: 'static>(&self) -> SerializationResult<Option<SerializationToken>> {
        let registration = self
            .registrations
            .get(&TypeId::of::<T>())
            .ok_or(SerializationError::NotRegistered(type_name::<T>()))?;
        Ok(registration.token.map(|token| SerializationToken {
            token,
            type_name: registration.type_name,
        }))
    }

    pub fn type_name_for_token(&self, token: u32) -> Option<&'static str> {
        self.tokens
            .get(&token)
            .and_then(|id| self.registrations.get(id))
            .map(|r| r.type_name)
    }

    /// All tokens in registration order.
    pub fn tokens(&self) -> impl Iterator<Item = SerializationToken> + '_ {
        self.tokens.iter().filter_map(|(token, id)| {
            self.registrations.get(id).map(|r| SerializationToken {
                token: *token,
                type_name: r.type_name,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{ElementType, PrimitiveArraySerialization};

    #[test]
    fn defaults_accept_exact_types_only() {
        let registry = SerializationRegistry::with_defaults().unwrap();
        assert!(registry.accept::<Vec<i32>>());
        assert!(registry.accept::<Vec<f32>>());
        assert!(registry.accept::<Chunk>());
        assert!(registry.accept::<DataValue>());
        assert!(!registry.accept::<Vec<i64>>());
        assert!(!registry.accept::<[i32; 4]>());
    }

    #[test]
    fn unregistered_type_is_reported() {
        let registry = SerializationRegistry::new();
        let err = registry.serialization::<Chunk>().err().unwrap();
        assert!(matches!(err, SerializationError::NotRegistered(_)));
    }

    #[test]
    fn array_tokens_are_published() {
        let registry = SerializationRegistry::with_defaults().unwrap();
        assert_eq!(
            registry.token_for::<Vec<i32>>().unwrap().map(|t| t.token),
            Some(ElementType::Int32.token())
        );
        assert_eq!(registry.token_for::<Vec<f32>>().unwrap().map(|t| t.token), Some(130));
        assert_eq!(registry.token_for::<Chunk>().unwrap(), None);
        assert!(registry.type_name_for_token(131).unwrap().contains("i32"));
        assert_eq!(registry.tokens().count(), 2);
    }

    #[test]
    fn token_bound_to_another_type_is_rejected() {
        struct Impostor;
        impl Serialization<Vec<i64>> for Impostor {
            fn token(&self) -> Option<u32> {
                Some(131)
            }
            fn serializer(&self) -> Box<dyn Serializer<Vec<i64>>> {
                unimplemented!()
            }
            fn deserializer(&self) -> Box<dyn Deserializer<Vec<i64>>> {
                unimplemented!()
            }
        }

        let mut registry = SerializationRegistry::with_defaults().unwrap();
        let err = registry.register::<Vec<i64>, _>(Impostor).unwrap_err();
        assert!(matches!(err, SerializationError::TokenConflict { token: 131, .. }));
        assert!(!registry.accept::<Vec<i64>>());
    }

    #[test]
    fn re_registering_same_type_keeps_token() {
        let mut registry = SerializationRegistry::with_defaults().unwrap();
        registry
            .register::<Vec<i32>, _>(PrimitiveArraySerialization::<i32>::default())
            .unwrap();
        assert_eq!(registry.type_name_for_token(131), Some(type_name::<Vec<i32>>()));
    }
}
