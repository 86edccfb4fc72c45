//! In-memory transport for deterministic tests: scripted failure behaviors,
//! per-route response queues, and a captured log of every outbound request.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use bytes::Bytes;
use reqwest::Method;

use super::adapter::{
    RestBytes, RestError, RestFuture, RestRequest, RestResponse, RestResult, RestTransport,
    RestTransportState,
};

/// What the mock does with the next request. Defaults to `Pass`, which serves
/// the next queued response (or an empty 200 when nothing is queued).
#[derive(Clone, Debug, Default)]
pub enum MockBehavior {
    #[default]
    Pass,
    Reject {
        status: u16,
        reason: String,
    },
    ConnectError {
        reason: String,
        retryable: bool,
    },
    SendError {
        reason: String,
        retryable: bool,
    },
    ReceiveError {
        reason: String,
        retryable: bool,
    },
    TimeoutError {
        reason: String,
        retryable: bool,
    },
    InternalError {
        reason: String,
    },
    Drop,
}

impl MockBehavior {
    pub fn reject(status: u16, reason: impl Into<String>) -> Self {
        Self::Reject {
            status,
            reason: reason.into(),
        }
    }

    pub fn connect_error(reason: impl Into<String>, retryable: bool) -> Self {
        Self::ConnectError {
            reason: reason.into(),
            retryable,
        }
    }

    pub fn send_error(reason: impl Into<String>, retryable: bool) -> Self {
        Self::SendError {
            reason: reason.into(),
            retryable,
        }
    }

    pub fn receive_error(reason: impl Into<String>, retryable: bool) -> Self {
        Self::ReceiveError {
            reason: reason.into(),
            retryable,
        }
    }

    pub fn timeout_error(reason: impl Into<String>, retryable: bool) -> Self {
        Self::TimeoutError {
            reason: reason.into(),
            retryable,
        }
    }

    pub fn internal_error(reason: impl Into<String>) -> Self {
        Self::InternalError {
            reason: reason.into(),
        }
    }

    pub fn drop_response() -> Self {
        Self::Drop
    }
}

#[derive(Clone, Debug, Default)]
pub struct MockBehaviorPlan {
    queue: VecDeque<MockBehavior>,
}

impl MockBehaviorPlan {
    pub fn push(&mut self, behavior: MockBehavior) -> &mut Self {
        self.queue.push_back(behavior);
        self
    }

    fn pop(&mut self) -> MockBehavior {
        self.queue.pop_front().unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, RestBytes)>,
    pub body: RestBytes,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<RestBytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, body.into())
    }
}

#[derive(Clone, Debug)]
pub struct MockRestStateSnapshot {
    pub state: RestTransportState,
    pub request_count: usize,
    pub last_url: Option<String>,
    pub last_status: Option<u16>,
    pub behavior_remaining: usize,
    pub response_queue_len: usize,
    pub last_error: Option<String>,
    pub elapsed_total: Duration,
}

#[derive(Debug)]
struct MockRestAdapterState {
    state: RestTransportState,
    request_count: usize,
    last_url: Option<String>,
    last_status: Option<u16>,
    behavior_plan: MockBehaviorPlan,
    default_response_queue: VecDeque<MockResponse>,
    route_response_queues: HashMap<(Method, String), VecDeque<MockResponse>>,
    outbound_log: Vec<RestRequest>,
    last_error: Option<String>,
    elapsed_total: Duration,
}

impl MockRestAdapterState {
    fn snapshot(&self) -> MockRestStateSnapshot {
        MockRestStateSnapshot {
            state: self.state,
            request_count: self.request_count,
            last_url: self.last_url.clone(),
            last_status: self.last_status,
            behavior_remaining: self.behavior_plan.len(),
            response_queue_len: self.default_response_queue.len()
                + self
                    .route_response_queues
                    .values()
                    .map(VecDeque::len)
                    .sum::<usize>(),
            last_error: self.last_error.clone(),
            elapsed_total: self.elapsed_total,
        }
    }
}

impl Default for MockRestAdapterState {
    fn default() -> Self {
        Self {
            state: RestTransportState::Idle,
            request_count: 0,
            last_url: None,
            last_status: None,
            behavior_plan: MockBehaviorPlan::default(),
            default_response_queue: VecDeque::new(),
            route_response_queues: HashMap::new(),
            outbound_log: Vec::new(),
            last_error: None,
            elapsed_total: Duration::ZERO,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MockRestAdapter {
    state: Arc<Mutex<MockRestAdapterState>>,
}

impl MockRestAdapter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockRestAdapterState::default())),
        }
    }

    pub fn with_behavior_plan(behavior_plan: MockBehaviorPlan) -> Self {
        let adapter = Self::new();
        adapter.lock("installing behavior plan").behavior_plan = behavior_plan;
        adapter
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        let mut plan = MockBehaviorPlan::default();
        plan.push(behavior);
        Self::with_behavior_plan(plan)
    }

    pub fn snapshot(&self) -> MockRestStateSnapshot {
        self.lock("taking snapshot").snapshot()
    }

    pub fn queue_response(&self, response: MockResponse) {
        self.lock("queueing response")
            .default_response_queue
            .push_back(response);
    }

    pub fn queue_response_for(
        &self,
        method: Method,
        url: impl Into<String>,
        response: MockResponse,
    ) {
        self.lock("queueing response by route")
            .route_response_queues
            .entry((method, url.into()))
            .or_default()
            .push_back(response);
    }

    pub fn queue_post_response(&self, url: impl Into<String>, response: MockResponse) {
        self.queue_response_for(Method::POST, url, response);
    }

    /// Every request the mock has seen, in order.
    pub fn outbound_requests(&self) -> Vec<RestRequest> {
        self.lock("reading outbound log").outbound_log.clone()
    }

    pub fn last_request(&self) -> Option<RestRequest> {
        self.lock("reading last request").outbound_log.last().cloned()
    }

    pub fn outbound_count(&self) -> usize {
        self.lock("reading outbound count").outbound_log.len()
    }

    fn lock(&self, while_doing: &str) -> std::sync::MutexGuard<'_, MockRestAdapterState> {
        self.state
            .lock()
            .unwrap_or_else(|_| panic!("mock transport mutex poisoned while {while_doing}"))
    }

    fn record_error(&self, error: RestError) -> RestError {
        let mut state = self.lock("recording error");
        state.state = RestTransportState::Error;
        state.last_error = Some(error.message().to_string());
        state.last_status = error.status();
        error
    }

    fn next_response(&self, request: &RestRequest) -> Option<MockResponse> {
        let mut state = self.lock("selecting response");
        let route_key = (request.method.clone(), request.url.clone());
        if let Some(queue) = state.route_response_queues.get_mut(&route_key) {
            if let Some(response) = queue.pop_front() {
                return Some(response);
            }
        }
        state.default_response_queue.pop_front()
    }
}

impl Default for MockRestAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RestTransport for MockRestAdapter {
    fn execute(&self, request: RestRequest) -> RestFuture<RestResult<RestResponse>> {
        let adapter = self.clone();
        Box::pin(async move {
            let start = Instant::now();

            let behavior = {
                let mut state = adapter.lock("starting request");
                state.request_count += 1;
                state.last_url = Some(request.url.clone());
                state.state = RestTransportState::Busy;
                state.last_error = None;
                state.outbound_log.push(request.clone());
                state.behavior_plan.pop()
            };

            match behavior {
                MockBehavior::Pass => {}
                MockBehavior::Drop => {
                    return Err(adapter.record_error(RestError::timeout(
                        "mock transport dropped response",
                        None,
                        false,
                    )));
                }
                MockBehavior::Reject { status, reason } => {
                    return Err(adapter.record_error(RestError::rejected(status, reason, true)));
                }
                MockBehavior::ConnectError { reason, retryable } => {
                    return Err(adapter.record_error(RestError::connect(reason, None, retryable)));
                }
                MockBehavior::SendError { reason, retryable } => {
                    return Err(adapter.record_error(RestError::send(reason, None, retryable)));
                }
                MockBehavior::ReceiveError { reason, retryable } => {
                    return Err(adapter.record_error(RestError::receive(reason, None, retryable)));
                }
                MockBehavior::TimeoutError { reason, retryable } => {
                    return Err(adapter.record_error(RestError::timeout(reason, None, retryable)));
                }
                MockBehavior::InternalError { reason } => {
                    return Err(adapter.record_error(RestError::internal(reason)));
                }
            }

            let elapsed = start.elapsed();
            let response = match adapter.next_response(&request) {
                Some(queued) => RestResponse {
                    status: queued.status,
                    headers: queued.headers,
                    body: queued.body,
                    elapsed,
                },
                // Empty queue serves a bare 200 so request-shape tests need
                // no response fixtures.
                None => RestResponse {
                    status: 200,
                    headers: Vec::new(),
                    body: Bytes::new(),
                    elapsed,
                },
            };

            let mut state = adapter.lock("recording response");
            state.last_status = Some(response.status);
            state.state = RestTransportState::Idle;
            state.elapsed_total += elapsed;
            drop(state);

            Ok(response)
        })
    }
}
