use std::sync::Arc;

use crate::{
    config::Config,
    services::{asset_store::AssetStore, CallCoordinator},
    store::{MessageStore, UserStore},
    websocket::PresenceRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MessageStore>,
    pub users: Arc<dyn UserStore>,
    pub assets: Arc<dyn AssetStore>,
    pub registry: PresenceRegistry,
    pub calls: CallCoordinator,
    pub config: Arc<Config>,
}
