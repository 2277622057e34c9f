//! `/events` over a real socket: the router is served on an ephemeral port
//! and driven with a WebSocket client.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, Stream, StreamExt};
use lookout::assistant::{
    AssistantError, QueryResponder, VisionModel, VisionRequest, NO_IMAGE_MESSAGE,
};
use lookout::observation::LastObservation;
use lookout::server::{self, AppState, DEFAULT_MAX_MESSAGE_SIZE};
use lookout::shutdown::Shutdown;
use lookout::stream::{CameraControl, Publisher};
use serde_json::json;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// Answers every question with "seen: <prompt>" and records the prompts.
#[derive(Default)]
struct EchoModel {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl VisionModel for EchoModel {
    async fn complete(&self, request: &VisionRequest) -> Result<String, AssistantError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(format!("seen: {}", request.prompt))
    }
}

struct Server {
    addr: SocketAddr,
    model: Arc<EchoModel>,
    shutdown: Shutdown,
    _static_dir: tempfile::TempDir,
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

async fn start(observation: Arc<LastObservation>) -> Server {
    let model = Arc::new(EchoModel::default());
    let shutdown = Shutdown::new();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

    let (camera, _commands) = CameraControl::channel();
    let state = AppState {
        publisher: Publisher::new(4),
        camera,
        responder: QueryResponder::new(model.clone(), observation),
        shutdown: shutdown.subscribe(),
        check_timeout: Duration::from_millis(100),
        max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
    };
    let app = server::router(state, dir.path());

    let listener = server::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, app, shutdown.subscribe()));

    Server {
        addr,
        model,
        shutdown,
        _static_dir: dir,
    }
}

fn observation_with(labels: &[&str]) -> Arc<LastObservation> {
    let observation = Arc::new(LastObservation::new());
    observation.publish(
        Bytes::from_static(b"\xFF\xD8jpeg\xFF\xD9"),
        labels.iter().map(|s| s.to_string()).collect(),
        64,
        48,
    );
    observation
}

async fn connect(
    addr: SocketAddr,
) -> tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>> {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/events", addr))
        .await
        .unwrap();
    ws
}

/// Next text frame as JSON, skipping control frames.
async fn next_event<S>(ws: &mut S) -> serde_json::Value
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                other => panic!("expected a text frame, got {:?}", other),
            }
        }
    })
    .await
    .unwrap()
}

fn ask(question: &str) -> Message {
    Message::Text(json!({"event": "ask_question", "data": {"question": question}}).to_string())
}

fn answer(text: &str) -> serde_json::Value {
    json!({"event": "answer", "data": {"answer": text}})
}

#[tokio::test]
async fn test_question_gets_answer_envelope() {
    let server = start(observation_with(&["person", "cup"])).await;
    let mut ws = connect(server.addr).await;

    ws.send(ask("What is the person holding?")).await.unwrap();

    let expected = "seen: I have a question about this image: What is the person holding?. Detected objects: person, cup";
    assert_eq!(next_event(&mut ws).await, answer(expected));
    assert_eq!(server.model.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_question_before_first_frame_gets_no_image_message() {
    let server = start(Arc::new(LastObservation::new())).await;
    let mut ws = connect(server.addr).await;

    ws.send(ask("Anything there?")).await.unwrap();

    assert_eq!(next_event(&mut ws).await, answer(NO_IMAGE_MESSAGE));
    assert!(server.model.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_frames_are_skipped_and_socket_stays_open() {
    let server = start(observation_with(&["cup"])).await;
    let mut ws = connect(server.addr).await;

    ws.send(Message::Text("not json".to_string())).await.unwrap();
    ws.send(Message::Text(r#"{"event":"dance","data":{}}"#.to_string()))
        .await
        .unwrap();
    ws.send(Message::Text(r#"{"event":"ask_question","data":{}}"#.to_string()))
        .await
        .unwrap();
    ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    ws.send(ask("Still there?")).await.unwrap();

    let reply = next_event(&mut ws).await;
    assert_eq!(reply["event"], "answer");
    assert!(reply["data"]["answer"]
        .as_str()
        .unwrap()
        .contains("Still there?"));
    // Only the well-formed question reached the model
    assert_eq!(server.model.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_frame_event_is_a_no_op() {
    let server = start(observation_with(&["dog"])).await;
    let mut ws = connect(server.addr).await;

    ws.send(Message::Text(
        json!({"event": "frame", "data": {"image": "data:image/jpeg;base64,AA=="}}).to_string(),
    ))
    .await
    .unwrap();
    ws.send(ask("Which animal?")).await.unwrap();

    // The first reply is the answer; the frame event produced nothing
    let reply = next_event(&mut ws).await;
    assert_eq!(reply["event"], "answer");
    assert!(reply["data"]["answer"].as_str().unwrap().ends_with("Detected objects: dog"));
    assert_eq!(server.model.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_each_question_gets_its_own_answer() {
    let server = start(observation_with(&["cup"])).await;
    let mut ws = connect(server.addr).await;

    ws.send(ask("first")).await.unwrap();
    ws.send(ask("second")).await.unwrap();

    let mut answers = vec![
        next_event(&mut ws).await["data"]["answer"]
            .as_str()
            .unwrap()
            .to_string(),
        next_event(&mut ws).await["data"]["answer"]
            .as_str()
            .unwrap()
            .to_string(),
    ];
    // Answers run concurrently and may arrive in either order
    answers.sort();
    assert!(answers[0].contains(": first."));
    assert!(answers[1].contains(": second."));
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let server = start(observation_with(&["cup"])).await;
    let mut a = connect(server.addr).await;
    let mut b = connect(server.addr).await;

    b.send(ask("from b")).await.unwrap();
    let reply = next_event(&mut b).await;
    assert!(reply["data"]["answer"].as_str().unwrap().contains("from b"));

    a.send(ask("from a")).await.unwrap();
    let reply = next_event(&mut a).await;
    assert!(reply["data"]["answer"].as_str().unwrap().contains("from a"));
}
