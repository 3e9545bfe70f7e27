use crate::studio::error::CatalogError;
use crate::studio::surface::DesignSurface;
use crate::studio::{CATALOG_PATH, DEFAULT_MODEL, DEFAULT_MODEL_SCALE, DEFAULT_PRODUCT};
use bevy::prelude::Resource;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

/// The printable regions a product model can expose. Keeps the mesh
/// registry and part lookups typed instead of stringly keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum PartKind {
    Outer,
    Inner,
    Handle,
    Base,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelCatalog {
    pub products: HashMap<String, HashMap<String, ModelConfig>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub glb_path: String,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub initial_rotation_deg: Option<f32>,
    #[serde(default)]
    pub camera_position: Option<[f32; 3]>,
    #[serde(default)]
    pub min_distance: Option<f32>,
    #[serde(default)]
    pub max_distance: Option<f32>,
    pub parts: Vec<PartConfig>,
}

fn default_scale() -> f32 {
    DEFAULT_MODEL_SCALE
}

#[derive(Debug, Clone, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

/// Print-canvas geometry for one part, in canvas pixel space.
///
/// `mesh_node` names the GLTF node whose material receives the baked
/// design texture for this part.
#[derive(Debug, Clone, Deserialize)]
pub struct PartConfig {
    pub kind: PartKind,
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub margins: Margins,
    #[serde(default)]
    pub guide_color: Option<[f32; 4]>,
    pub mesh_node: String,
}

impl ModelCatalog {
    pub fn model(&self, product: &str, model: &str) -> Result<&ModelConfig, CatalogError> {
        let models = self
            .products
            .get(product)
            .ok_or_else(|| CatalogError::UnknownProduct(product.to_string()))?;
        models.get(model).ok_or_else(|| CatalogError::UnknownModel {
            product: product.to_string(),
            model: model.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        for models in self.products.values() {
            for (model_id, config) in models {
                if config.parts.is_empty() {
                    return Err(CatalogError::NoParts {
                        model: model_id.clone(),
                    });
                }
                for part in &config.parts {
                    validate_part(model_id, part)?;
                }
            }
        }
        Ok(())
    }
}

fn validate_part(model_id: &str, part: &PartConfig) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidPart {
        model: model_id.to_string(),
        part: part.kind,
        reason,
    };

    if part.canvas_width <= 0.0 || part.canvas_height <= 0.0 {
        return Err(invalid(format!(
            "canvas dimensions must be positive, got {}x{}",
            part.canvas_width, part.canvas_height
        )));
    }
    let m = &part.margins;
    if m.top < 0.0 || m.bottom < 0.0 || m.left < 0.0 || m.right < 0.0 {
        return Err(invalid("margins must not be negative".to_string()));
    }
    let interior_width = part.canvas_width - (m.left + m.right);
    let interior_height = part.canvas_height - (m.top + m.bottom);
    if interior_width <= 0.0 || interior_height <= 0.0 {
        return Err(invalid(format!(
            "margins leave no printable interior ({interior_width}x{interior_height})"
        )));
    }
    if part.mesh_node.trim().is_empty() {
        return Err(invalid("mesh_node must not be empty".to_string()));
    }
    Ok(())
}

pub fn load_catalog() -> Result<ModelCatalog, CatalogError> {
    let text = fs::read_to_string(CATALOG_PATH).map_err(|err| CatalogError::Io {
        path: CATALOG_PATH.to_string(),
        source: err,
    })?;
    let catalog = ron::de::from_str::<ModelCatalog>(&text).map_err(|err| CatalogError::Parse {
        path: CATALOG_PATH.to_string(),
        source: err,
    })?;
    catalog.validate()?;
    Ok(catalog)
}

pub fn default_catalog() -> ModelCatalog {
    let mut models = HashMap::new();
    models.insert(DEFAULT_MODEL.to_string(), default_model_config());
    let mut products = HashMap::new();
    products.insert(DEFAULT_PRODUCT.to_string(), models);
    ModelCatalog { products }
}

pub fn default_model_config() -> ModelConfig {
    ModelConfig {
        glb_path: "assets/models/mug.glb".to_string(),
        scale: DEFAULT_MODEL_SCALE,
        initial_rotation_deg: None,
        camera_position: None,
        min_distance: None,
        max_distance: None,
        parts: vec![default_outer_part()],
    }
}

pub fn default_outer_part() -> PartConfig {
    PartConfig {
        kind: PartKind::Outer,
        canvas_width: 1600.0,
        canvas_height: 700.0,
        margins: Margins {
            top: 40.0,
            bottom: 40.0,
            left: 40.0,
            right: 40.0,
        },
        guide_color: None,
        mesh_node: "Object_4".to_string(),
    }
}

/// The product/model/part selected for this session. Read-only after
/// startup; there is no in-app model switcher.
#[derive(Resource)]
pub struct ActiveModel {
    pub product: String,
    pub model_id: String,
    pub config: ModelConfig,
    pub part: PartKind,
}

impl ActiveModel {
    pub fn part_config(&self) -> Option<&PartConfig> {
        self.config.parts.iter().find(|p| p.kind == self.part)
    }
}

pub fn load_initial_state() -> (ActiveModel, DesignSurface) {
    let catalog = load_catalog().unwrap_or_else(|err| {
        eprintln!("Falling back to built-in catalog: {err}");
        default_catalog()
    });

    let config = match catalog.model(DEFAULT_PRODUCT, DEFAULT_MODEL) {
        Ok(config) => config.clone(),
        Err(err) => {
            eprintln!("Catalog is missing {DEFAULT_PRODUCT}/{DEFAULT_MODEL}: {err}; using built-in model");
            default_model_config()
        }
    };

    let part = config.parts.first().map(|p| p.kind).unwrap_or(PartKind::Outer);
    let part_config = config
        .parts
        .iter()
        .find(|p| p.kind == part)
        .cloned()
        .unwrap_or_else(default_outer_part);

    let surface = DesignSurface::new(part, part_config);
    let active = ActiveModel {
        product: DEFAULT_PRODUCT.to_string(),
        model_id: DEFAULT_MODEL.to_string(),
        config,
        part,
    };
    (active, surface)
}
