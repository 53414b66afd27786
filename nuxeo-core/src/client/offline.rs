//! # Client State: Offline
//!
//! This module defines the `NuxeoClient` behavior when it is not connected to any server.
//! Captured responses can still be converted, which is what the CLI `decode` command relies on.
use super::{NuxeoClient, Offline};
use crate::{
    entity::registry::EntityRegistry,
    error::ConvertError,
    marshal::converter::{ConversionTarget, Converted, RawResponse, ResponseConverter},
};
use std::io::Read;

impl NuxeoClient<Offline> {
    /// Creates a client in the `Offline` state.
    ///
    /// # Arguments
    ///
    /// * `registry` - The entity types the converter resolves automation results against.
    pub fn offline(registry: EntityRegistry) -> Self {
        Self::new(Offline, ResponseConverter::new(registry))
    }

    /// Converts a captured response as if it had just been received.
    pub fn convert<B: Read>(
        &self,
        response: RawResponse<B>,
        target: ConversionTarget,
    ) -> Result<Converted, ConvertError> {
        self.converter.convert(response, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityShape;
    use http::{HeaderMap, HeaderValue, header::CONTENT_TYPE};

    #[test]
    fn test_offline_convert_uses_shared_registry() {
        let client = NuxeoClient::offline(EntityRegistry::empty());
        let clone = client.clone();
        clone.register_entity("task", EntityShape::Generic);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let response =
            RawResponse::from_bytes(headers, r#"{"entity-type":"task","id":"t1"}"#.as_bytes());

        let converted = client.convert(response, ConversionTarget::Unknown).unwrap();
        let entity = converted.into_entity().unwrap();
        assert_eq!(entity.shape(), EntityShape::Generic);
        assert_eq!(client.registry().lookup("task"), Some(EntityShape::Generic));
    }
}
