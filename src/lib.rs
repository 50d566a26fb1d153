pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod jobs;

use anyhow::{anyhow, Result};
use url::Url;

use crate::app::activity::ActivityLog;
use crate::app::auth::AuthService;
use crate::app::chat::{ChatFeed, ChatService};
use crate::app::inflight::InFlight;
use crate::app::notifications::NotificationService;
use crate::app::rate_limiter::RateLimiter;
use crate::app::requests::RequestService;
use crate::app::router::NotificationRouter;
use crate::app::shifts::ShiftService;
use crate::app::users::UserService;
use crate::config::AppConfig;
use crate::infra::{cache::RedisCache, db::Db, queue::QueueClient, storage::ObjectStorage};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub cache: RedisCache,
    pub storage: ObjectStorage,
    pub queue: QueueClient,
    pub chat_feed: ChatFeed,
    pub inflight: InFlight,
    pub app_origin: Url,
    pub upload_url_ttl_seconds: u64,
    pub upload_max_bytes: i64,
    pub admin_token: Option<String>,
    pub paseto_access_key: [u8; 32],
    pub paseto_refresh_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub refresh_ttl_days: u64,
    pub chat_window_size: i64,
    pub chat_messages_per_minute: u32,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        db: Db,
        cache: RedisCache,
        storage: ObjectStorage,
        queue: QueueClient,
    ) -> Result<Self> {
        let app_origin = Url::parse(&config.app_origin)
            .map_err(|err| anyhow!("invalid APP_ORIGIN: {}", err))?;

        Ok(Self {
            db,
            cache,
            storage,
            queue,
            chat_feed: ChatFeed::new(),
            inflight: InFlight::new(),
            app_origin,
            upload_url_ttl_seconds: config.upload_url_ttl_seconds,
            upload_max_bytes: config.upload_max_bytes,
            admin_token: config.admin_token.clone(),
            paseto_access_key: config.paseto_access_key,
            paseto_refresh_key: config.paseto_refresh_key,
            access_ttl_minutes: config.access_ttl_minutes,
            refresh_ttl_days: config.refresh_ttl_days,
            chat_window_size: config.chat_window_size,
            chat_messages_per_minute: config.chat_messages_per_minute,
        })
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(
            self.db.clone(),
            self.paseto_access_key,
            self.paseto_refresh_key,
            self.access_ttl_minutes,
            self.refresh_ttl_days,
        )
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(self.db.clone())
    }

    pub fn activity_log(&self) -> ActivityLog {
        ActivityLog::new(self.db.clone())
    }

    pub fn notification_service(&self) -> NotificationService {
        NotificationService::new(self.db.clone(), self.queue.clone())
    }

    pub fn request_service(&self) -> RequestService {
        RequestService::new(
            self.db.clone(),
            self.notification_service(),
            self.activity_log(),
            self.inflight.clone(),
        )
    }

    pub fn shift_service(&self) -> ShiftService {
        ShiftService::new(
            self.db.clone(),
            self.notification_service(),
            self.activity_log(),
        )
    }

    pub fn chat_service(&self) -> ChatService {
        ChatService::new(
            self.db.clone(),
            RateLimiter::new(self.cache.clone()),
            self.storage.clone(),
            self.chat_feed.clone(),
            self.activity_log(),
            self.chat_messages_per_minute,
        )
    }

    pub fn notification_router(&self) -> NotificationRouter {
        NotificationRouter::new(
            self.notification_service(),
            self.request_service(),
            self.shift_service(),
        )
    }
}
