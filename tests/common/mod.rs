use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use pcnc_api::{
    config::{AppConfig, MpesaSettings},
    db,
    entities::{order, promo_code},
    events::{self, EventSender},
    AppServices, AppState,
};

pub const ADMIN_KEY: &str = "test-admin-key-0123456789";

/// In-memory application wired exactly like main(), minus the listener.
pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_mpesa_base_url(None).await
    }

    /// `base_url` points the payment client at a mock provider.
    pub async fn with_mpesa_base_url(base_url: Option<String>) -> Self {
        // Single connection: a pooled in-memory SQLite would hand each
        // connection its own empty database.
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options)
            .await
            .expect("failed to open in-memory database");
        db::run_migrations(&db).await.expect("migrations failed");

        let (event_tx, event_rx) = mpsc::channel(64);
        tokio::spawn(events::process_events(event_rx));
        let event_sender = EventSender::new(event_tx);

        let mut mpesa = MpesaSettings::default();
        if let Some(url) = base_url {
            mpesa.base_url = url;
        }
        mpesa.timeout_secs = 5;

        let config = AppConfig {
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 0,
            environment: "test".into(),
            log_level: "info".into(),
            log_json: false,
            auto_migrate: true,
            admin_api_key: ADMIN_KEY.into(),
            cors_allowed_origins: None,
            mpesa,
        };

        let db = Arc::new(db);
        let config = Arc::new(config);
        let services = AppServices::new(db.clone(), event_sender.clone(), &config)
            .expect("failed to build services");

        Self {
            state: AppState {
                db,
                config,
                event_sender,
                services,
            },
        }
    }

    pub fn router(&self) -> axum::Router {
        pcnc_api::app(self.state.clone())
    }

    pub async fn seed_promo(&self, code: &str, percent: i32) {
        promo_code::ActiveModel {
            code: Set(code.to_string()),
            discount_percent: Set(percent),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed promo code");
    }

    /// Inserts a bare prior order for loyalty-count tests.
    pub async fn seed_order_with_payment_status(&self, phone: &str, payment_status: &str) {
        order::ActiveModel {
            id: Set(format!("ORD-{}", Uuid::new_v4().simple())),
            customer_name: Set("Prior Customer".into()),
            phone_number: Set(phone.to_string()),
            location: Set("Pick Up".into()),
            lat: Set(None),
            lng: Set(None),
            notes: Set(None),
            subtotal: Set(dec!(1000)),
            discount_amount: Set(dec!(0)),
            delivery_fee: Set(dec!(0)),
            total_amount: Set(dec!(1000)),
            promo_code: Set(None),
            payment_method: Set("till".into()),
            status: Set("Delivered".into()),
            payment_status: Set(payment_status.to_string()),
            assigned_rider_id: Set(None),
            estimated_time: Set(None),
            rating: Set(None),
            feedback: Set(None),
            date: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed order");
    }
}
