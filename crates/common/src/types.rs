use serde::Serialize;
use uuid::Uuid;

/// Identity payload served on `/info`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub instance_id: Uuid,
}

impl ServiceInfo {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            instance_id: Uuid::new_v4(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_ids_are_unique_per_instance() {
        let a = ServiceInfo::new("courtsync-etl");
        let b = ServiceInfo::new("courtsync-etl");
        assert_eq!(a.service, b.service);
        assert_ne!(a.instance_id, b.instance_id);
    }
}
