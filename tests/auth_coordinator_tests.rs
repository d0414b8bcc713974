use async_trait::async_trait;
use charades_companion::auth::{
    AuthCoordinator, AuthSurface, AuthSurfaceFactory, CoordinatorOptions, SurfaceEvent,
};
use charades_companion::bridge::{BridgeHandle, UiEvent};
use charades_companion::error::CharadesError;
use charades_companion::store::{self, StoreHandle};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, timeout};
use url::Url;

const LOGIN_URL: &str = "http://localhost:3000/auth/login";
const CALLBACK_URL: &str = "http://localhost:3000/auth/callback?code=abc";

/// Scriptable stand-in for the sign-in window.
struct FakeSurface {
    url: Mutex<Option<Url>>,
    payload: Mutex<Option<Value>>,
    read_failures: AtomicU32,
    closed: AtomicBool,
    tx: mpsc::UnboundedSender<SurfaceEvent>,
}

impl FakeSurface {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SurfaceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let surface = Arc::new(Self {
            url: Mutex::new(None),
            payload: Mutex::new(None),
            read_failures: AtomicU32::new(0),
            closed: AtomicBool::new(false),
            tx,
        });
        (surface, rx)
    }

    /// Simulate a page finishing load at `url`.
    fn finish_load(&self, url: &str) {
        *self.url.lock().unwrap() = Some(Url::parse(url).unwrap());
        let _ = self.tx.send(SurfaceEvent::LoadFinished);
    }

    /// Make the callback page expose a payload object.
    fn publish_payload(&self, payload: Value) {
        *self.payload.lock().unwrap() = Some(payload);
    }

    /// Simulate the user closing the window.
    fn user_close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.tx.send(SurfaceEvent::Closed);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthSurface for FakeSurface {
    fn current_url(&self) -> Option<Url> {
        self.url.lock().unwrap().clone()
    }

    async fn read_callback_payload(&self) -> Result<Option<Value>, CharadesError> {
        if self.read_failures.load(Ordering::SeqCst) > 0 {
            self.read_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(CharadesError::Surface("script execution failed".to_string()));
        }
        Ok(self.payload.lock().unwrap().clone())
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(SurfaceEvent::Closed);
        }
    }
}

/// Factory handing out pre-built surfaces, one per `open` call.
struct FakeFactory {
    prepared: Mutex<VecDeque<(Arc<FakeSurface>, mpsc::UnboundedReceiver<SurfaceEvent>)>>,
}

impl FakeFactory {
    fn with_surfaces(count: usize) -> (Arc<Self>, Vec<Arc<FakeSurface>>) {
        let mut prepared = VecDeque::new();
        let mut handles = Vec::new();
        for _ in 0..count {
            let (surface, rx) = FakeSurface::new();
            handles.push(surface.clone());
            prepared.push_back((surface, rx));
        }
        (
            Arc::new(Self {
                prepared: Mutex::new(prepared),
            }),
            handles,
        )
    }
}

#[async_trait]
impl AuthSurfaceFactory for FakeFactory {
    async fn open(
        &self,
        _login_url: &Url,
    ) -> Result<(Arc<dyn AuthSurface>, mpsc::UnboundedReceiver<SurfaceEvent>), CharadesError> {
        let (surface, rx) = self
            .prepared
            .lock()
            .unwrap()
            .pop_front()
            .expect("no prepared fake surface left");
        Ok((surface as Arc<dyn AuthSurface>, rx))
    }
}

fn temp_database() -> (String, PathBuf) {
    let tmp_dir = std::env::temp_dir();
    let mut hasher = DefaultHasher::new();
    SystemTime::now().hash(&mut hasher);
    let db_path = tmp_dir.join(format!("test_db_{}.sqlite", hasher.finish()));
    let database_url = format!("sqlite:{}", db_path.to_str().unwrap());
    (database_url, db_path)
}

fn cleanup(db_path: &PathBuf) {
    let _ = std::fs::remove_file(format!("{}-wal", db_path.to_string_lossy()));
    let _ = std::fs::remove_file(format!("{}-shm", db_path.to_string_lossy()));
    let _ = std::fs::remove_file(db_path);
}

fn fast_options() -> CoordinatorOptions {
    CoordinatorOptions {
        login_url: Url::parse(LOGIN_URL).unwrap(),
        callback_prefix: Url::parse("http://localhost:3000/auth/callback").unwrap(),
        success_close_delay: Duration::ZERO,
        sign_in_timeout: Duration::from_secs(5),
        extraction_grace: Duration::from_millis(50),
    }
}

fn callback_payload() -> Value {
    json!({
        "user_id": "42",
        "username": "ash",
        "display_name": "Ash",
        "email": "ash@example.com",
        "profile_image_url": "https://cdn.twitch.tv/ash.png",
        "access_token": "t1",
        "refresh_token": "r1",
        "expires_in": "3600"
    })
}

async fn setup(
    surfaces: usize,
) -> (
    AuthCoordinator,
    StoreHandle,
    Vec<Arc<FakeSurface>>,
    broadcast::Receiver<UiEvent>,
    PathBuf,
) {
    let (database_url, db_path) = temp_database();
    let store = store::spawn(&database_url).await.unwrap();
    let bridge = BridgeHandle::default();
    let rx = bridge.subscribe();
    let (factory, handles) = FakeFactory::with_surfaces(surfaces);
    let coordinator = AuthCoordinator::new(store.clone(), bridge, factory, fast_options());
    (coordinator, store, handles, rx, db_path)
}

async fn next_event(rx: &mut broadcast::Receiver<UiEvent>) -> UiEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for bridge event")
        .expect("bridge channel closed")
}

async fn wait_until_idle(coordinator: &AuthCoordinator) {
    for _ in 0..500 {
        if !coordinator.sign_in_in_progress() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("coordinator never went idle");
}

#[tokio::test]
async fn successful_sign_in_stores_session_and_notifies() {
    let (coordinator, store, surfaces, mut rx, db_path) = setup(1).await;
    let surface = &surfaces[0];

    coordinator.begin_sign_in().await.unwrap();
    assert!(coordinator.sign_in_in_progress());

    // Login page load is ignored; only the callback prefix matters.
    surface.finish_load(LOGIN_URL);
    surface.publish_payload(callback_payload());
    surface.finish_load(CALLBACK_URL);

    assert_eq!(
        next_event(&mut rx).await,
        UiEvent::SessionEstablished {
            display_name: "Ash".to_string(),
            avatar_url: "https://cdn.twitch.tv/ash.png".to_string(),
        }
    );

    let record = store.get_session("42").await.unwrap().unwrap();
    assert_eq!(record.twitch_id, "42");
    assert_eq!(record.access_token, "t1");
    assert_eq!(record.refresh_token, "r1");
    assert_eq!(record.expires_in, Some(3600));
    assert!(record.auth_payload.unwrap().contains("\"user_id\":\"42\""));

    assert!(surface.is_closed());
    wait_until_idle(&coordinator).await;
    cleanup(&db_path);
}

#[tokio::test]
async fn provider_error_payload_fails_and_closes_window() {
    let (coordinator, store, surfaces, mut rx, db_path) = setup(1).await;
    let surface = &surfaces[0];

    coordinator.begin_sign_in().await.unwrap();
    surface.publish_payload(json!({"error": "access_denied"}));
    surface.finish_load(CALLBACK_URL);

    assert_eq!(
        next_event(&mut rx).await,
        UiEvent::SignInFailed {
            reason: "access_denied".to_string(),
        }
    );
    assert!(surface.is_closed());
    assert!(store.get_sole_session().await.unwrap().is_none());

    wait_until_idle(&coordinator).await;
    cleanup(&db_path);
}

#[tokio::test]
async fn closing_window_before_payload_cancels_once() {
    let (coordinator, store, surfaces, mut rx, db_path) = setup(2).await;

    coordinator.begin_sign_in().await.unwrap();
    surfaces[0].finish_load(LOGIN_URL);
    surfaces[0].user_close();

    assert_eq!(next_event(&mut rx).await, UiEvent::SignInCancelled);
    assert!(store.get_sole_session().await.unwrap().is_none());
    wait_until_idle(&coordinator).await;

    // The guard is released: a new attempt may start.
    coordinator.begin_sign_in().await.unwrap();
    assert!(coordinator.cancel_sign_in().await);
    assert_eq!(next_event(&mut rx).await, UiEvent::SignInCancelled);
    wait_until_idle(&coordinator).await;

    cleanup(&db_path);
}

#[tokio::test]
async fn second_sign_in_while_window_open_is_rejected() {
    let (coordinator, _store, surfaces, mut rx, db_path) = setup(1).await;

    coordinator.begin_sign_in().await.unwrap();
    let err = coordinator.begin_sign_in().await.unwrap_err();
    assert!(matches!(err, CharadesError::SignInInProgress));

    surfaces[0].user_close();
    assert_eq!(next_event(&mut rx).await, UiEvent::SignInCancelled);
    wait_until_idle(&coordinator).await;
    cleanup(&db_path);
}

#[tokio::test]
async fn repeated_extraction_failures_time_out_to_failure() {
    let (coordinator, store, surfaces, mut rx, db_path) = setup(1).await;
    let surface = &surfaces[0];
    surface.read_failures.store(u32::MAX, Ordering::SeqCst);

    coordinator.begin_sign_in().await.unwrap();
    surface.finish_load(CALLBACK_URL);

    assert_eq!(
        next_event(&mut rx).await,
        UiEvent::SignInFailed {
            reason: "sign-in timed out".to_string(),
        }
    );
    assert!(surface.is_closed());
    assert!(store.get_sole_session().await.unwrap().is_none());

    wait_until_idle(&coordinator).await;
    cleanup(&db_path);
}

#[tokio::test]
async fn silent_window_hits_overall_deadline() {
    let (database_url, db_path) = temp_database();
    let store = store::spawn(&database_url).await.unwrap();
    let bridge = BridgeHandle::default();
    let mut rx = bridge.subscribe();
    let (factory, surfaces) = FakeFactory::with_surfaces(1);
    let options = CoordinatorOptions {
        sign_in_timeout: Duration::from_millis(30),
        ..fast_options()
    };
    let coordinator = AuthCoordinator::new(store, bridge, factory, options);

    coordinator.begin_sign_in().await.unwrap();

    assert_eq!(
        next_event(&mut rx).await,
        UiEvent::SignInFailed {
            reason: "sign-in timed out".to_string(),
        }
    );
    assert!(surfaces[0].is_closed());

    wait_until_idle(&coordinator).await;
    cleanup(&db_path);
}
