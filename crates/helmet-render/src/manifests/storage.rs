//! PersistentVolumeClaim for `persistence`

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use crate::error::{RenderError, Result};
use crate::manifest::RenderedManifest;
use crate::scope::Scope;

/// `-` means an explicit empty class, which disables dynamic provisioning
fn storage_class_name(storage_class: &str) -> Option<String> {
    match storage_class {
        "" => None,
        "-" => Some(String::new()),
        class => Some(class.to_string()),
    }
}

pub fn pvc(scope: &Scope<'_>) -> Result<Option<RenderedManifest>> {
    let persistence = &scope.values.persistence;
    if !persistence.enabled || !persistence.existing_claim.is_empty() {
        return Ok(None);
    }
    if persistence.size.is_empty() {
        return Err(RenderError::MissingRequired {
            key: "persistence.size".to_string(),
        });
    }

    let object = PersistentVolumeClaim {
        metadata: scope.metadata(&scope.fullname, &persistence.annotations),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(persistence.access_modes.clone()),
            storage_class_name: storage_class_name(&persistence.storage_class),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(persistence.size.clone()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };
    RenderedManifest::from_resource(scope.source("pvc.yaml"), &object).map(Some)
}
