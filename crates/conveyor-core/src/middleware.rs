use axum::http::HeaderValue;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MakeUuidRequestId;

impl MakeRequestId for MakeUuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the request-id layer. Apply with `.layer(request_id_layer())` in router,
/// after [`propagate_request_id_layer`] so it wraps it.
pub fn request_id_layer() -> SetRequestIdLayer<MakeUuidRequestId> {
    SetRequestIdLayer::new(
        axum::http::HeaderName::from_static(REQUEST_ID_HEADER),
        MakeUuidRequestId,
    )
}

/// Copy the request id onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(axum::http::HeaderName::from_static(REQUEST_ID_HEADER))
}
