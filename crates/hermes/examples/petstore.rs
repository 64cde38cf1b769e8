//! A pet store served with Hermes.
//!
//! Every route runs behind an API-key pre-check. Run with:
//!
//! ```text
//! PETSTORE_API_KEY=secret cargo run -p hermes --example petstore
//!
//! curl -H 'x-api-key: secret' -d '{"name":"rex","category":"dog"}' localhost:8080/pets
//! curl -H 'x-api-key: secret' 'localhost:8080/pets?categories=dog&categories=cat&hasPhotos=false'
//! curl -H 'x-api-key: secret' localhost:8080/pets/rex
//! ```
//!
//! Configuration is read from `hermes.toml` (optional), `.env` and
//! `HERMES__*` environment variables.

use std::sync::Arc;

use hermes::prelude::*;
use hermes::server::ServerConfig;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct Pet {
    name: String,
    category: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    photos: Vec<String>,
}

hermes::core::value!(Pet => json);
impl Resource for Pet {}

/// Query filter for listing pets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PetFilter {
    categories: Vec<String>,
    #[serde(rename = "hasPhotos")]
    has_photos: Option<bool>,
}

hermes::core::value!(PetFilter);

impl Resource for PetFilter {
    fn bindings() -> &'static [Binding] {
        const BINDINGS: &[Binding] = &[
            Binding::query_all("categories", "categories"),
            Binding::query("hasPhotos", "hasPhotos"),
        ];
        BINDINGS
    }
}

impl PetFilter {
    fn matches(&self, pet: &Pet) -> bool {
        let category = self.categories.is_empty() || self.categories.contains(&pet.category);
        let photos = self
            .has_photos
            .map_or(true, |has_photos| has_photos == !pet.photos.is_empty());
        category && photos
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PetName {
    name: String,
}

hermes::core::value!(PetName);

impl Resource for PetName {
    fn bindings() -> &'static [Binding] {
        const BINDINGS: &[Binding] = &[Binding::segment("name", "name")];
        BINDINGS
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ApiKey {
    key: String,
}

hermes::core::value!(ApiKey);

impl Resource for ApiKey {
    fn bindings() -> &'static [Binding] {
        const BINDINGS: &[Binding] = &[Binding::header("key", "x-api-key")];
        BINDINGS
    }
}

/// The authenticated caller, produced by the API-key check.
#[derive(Debug)]
struct Caller {
    key_suffix: String,
}

hermes::core::value!(Caller);

#[derive(Debug, Default)]
struct PetStore {
    pets: RwLock<Vec<Pet>>,
}

impl PetStore {
    fn add(&self, pet: Pet) -> Result<JsonResponse<Pet>, HttpError> {
        if pet.name.is_empty() {
            return Err(HttpError::bad_request("name is required"));
        }
        let mut pets = self.pets.write();
        if pets.iter().any(|existing| existing.name == pet.name) {
            return Err(HttpError::conflict(format!("pet {} already exists", pet.name)));
        }
        pets.push(pet.clone());
        Ok(JsonResponse::created(pet))
    }

    fn list(&self, filter: &PetFilter) -> Vec<Pet> {
        self.pets
            .read()
            .iter()
            .filter(|pet| filter.matches(pet))
            .cloned()
            .collect()
    }

    fn get(&self, name: &str) -> Result<Pet, HttpError> {
        self.pets
            .read()
            .iter()
            .find(|pet| pet.name == name)
            .cloned()
            .ok_or_else(|| HttpError::not_found(format!("pet {name} not found")))
    }

    fn update(&self, name: &str, update: Pet) -> Result<Pet, HttpError> {
        let mut pets = self.pets.write();
        let pet = pets
            .iter_mut()
            .find(|pet| pet.name == name)
            .ok_or_else(|| HttpError::not_found(format!("pet {name} not found")))?;
        pet.category = update.category;
        pet.photos = update.photos;
        Ok(pet.clone())
    }

    fn clear(&self) -> usize {
        let mut pets = self.pets.write();
        let removed = pets.len();
        pets.clear();
        removed
    }
}

#[derive(Debug, Serialize)]
struct Cleared {
    removed: usize,
}

hermes::core::value!(Cleared => json);

fn routes(store: &Arc<PetStore>, api_key: String, base: &PipelineBuilder) -> Router {
    let base = base.clone().pre_check(move |key: ApiKey| {
        if key.key.is_empty() || key.key != api_key {
            return Err(HttpError::unauthorized("Unauthorized."));
        }
        let visible = key.key.len().saturating_sub(4);
        Ok(Caller {
            key_suffix: key.key.get(visible..).unwrap_or_default().to_string(),
        })
    });

    let add = {
        let store = Arc::clone(store);
        base.wrap(move |pet: Pet, caller: Shared<Caller>| {
            tracing::info!(pet = %pet.name, caller = %caller.key_suffix, "adding pet");
            store.add(pet)
        })
    };
    let list = {
        let store = Arc::clone(store);
        base.wrap(move |filter: PetFilter| store.list(&filter))
    };
    let get = {
        let store = Arc::clone(store);
        base.wrap(move |path: PetName| store.get(&path.name))
    };
    let update = {
        let store = Arc::clone(store);
        base.wrap(move |path: PetName, pet: Pet| store.update(&path.name, pet))
    };
    let clear = {
        let store = Arc::clone(store);
        base.wrap(move || Cleared {
            removed: store.clear(),
        })
    };

    Router::new()
        .route(Method::POST, "/pets", add)
        .route(Method::GET, "/pets", list)
        .route(Method::DELETE, "/pets", clear)
        .route(Method::GET, "/pets/{name}", get)
        .route(Method::PUT, "/pets/{name}", update)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .with_development()
        .with_optional_file("hermes.toml")?
        .with_dotenv()?
        .with_default_env()
        .load()?;

    init_logging(&LogConfig::from(&config.logging))?;

    let api_key = std::env::var("PETSTORE_API_KEY").unwrap_or_else(|_| "secret".to_string());
    let store = Arc::new(PetStore::default());
    let router = routes(&store, api_key, &hermes::standard_with(&config.decoder));

    tracing::info!(addr = %config.server.http_addr, "starting pet store");
    Server::new(ServerConfig::from(&config.server))
        .serve(router)
        .await?;
    Ok(())
}
