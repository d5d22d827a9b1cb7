use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::error::LedgerError;
use super::fees::{PaymentInput, PaymentMethod, PaymentReceipt};
use super::ids::{FeeId, RoomChangeId, RoomId, StudentId};
use super::notify::Notifier;
use super::pricing::{Amenities, RoomType};
use super::room_change::{RoomChangeRequest, RoomChangeSubmission};
use super::rooms::{MaintenanceStatus, RoomDraft};
use super::service::{FeeAssignment, HostelService, WalletCredit};
use super::store::HostelRepository;
use super::students::StudentDraft;

type SharedService<R, N> = Arc<HostelService<R, N>>;

/// Router builder exposing the pricing, allocation, fee, wallet and room-change endpoints.
pub fn ledger_router<R, N>(service: SharedService<R, N>) -> Router
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/v1/pricing/quote", post(quote_handler::<R, N>))
        .route("/api/v1/rooms", post(create_room_handler::<R, N>))
        .route("/api/v1/rooms/:room_id", get(room_handler::<R, N>))
        .route(
            "/api/v1/rooms/:room_id/amenities",
            put(amenities_handler::<R, N>),
        )
        .route(
            "/api/v1/rooms/:room_id/maintenance",
            put(maintenance_handler::<R, N>),
        )
        .route("/api/v1/students", post(register_student_handler::<R, N>))
        .route("/api/v1/students/:student_id", get(student_handler::<R, N>))
        .route(
            "/api/v1/students/:student_id/allocation",
            post(allocate_handler::<R, N>).delete(vacate_handler::<R, N>),
        )
        .route(
            "/api/v1/students/:student_id/fees",
            get(student_fees_handler::<R, N>),
        )
        .route(
            "/api/v1/students/:student_id/wallet",
            get(wallet_handler::<R, N>),
        )
        .route(
            "/api/v1/students/:student_id/wallet/credits",
            post(wallet_credit_handler::<R, N>),
        )
        .route(
            "/api/v1/students/:student_id/wallet/apply",
            post(wallet_apply_handler::<R, N>),
        )
        .route("/api/v1/fees", post(assign_fee_handler::<R, N>))
        .route(
            "/api/v1/fees/late-fees/sweep",
            post(late_fee_sweep_handler::<R, N>),
        )
        .route("/api/v1/fees/:fee_id", get(fee_handler::<R, N>))
        .route(
            "/api/v1/fees/:fee_id/payments",
            post(fee_payment_handler::<R, N>),
        )
        .route("/api/v1/room-changes", post(submit_change_handler::<R, N>))
        .route(
            "/api/v1/room-changes/:request_id",
            get(room_change_handler::<R, N>),
        )
        .route(
            "/api/v1/room-changes/:request_id/payments",
            post(change_payment_handler::<R, N>),
        )
        .route(
            "/api/v1/room-changes/:request_id/review",
            post(review_handler::<R, N>),
        )
        .route(
            "/api/v1/room-changes/:request_id/approve",
            post(approve_handler::<R, N>),
        )
        .route(
            "/api/v1/room-changes/:request_id/reject",
            post(reject_handler::<R, N>),
        )
        .route(
            "/api/v1/room-changes/:request_id/cancel",
            post(cancel_handler::<R, N>),
        )
        .with_state(service)
}

pub(crate) fn error_response(error: LedgerError) -> Response {
    let status = error.status_code();
    debug!(status = status.as_u16(), error = %error, "ledger request refused");
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, outcome: Result<T, LedgerError>) -> Response {
    match outcome {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

fn today_or_local(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Local::now().date_naive())
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteRequest {
    pub(crate) room_type: RoomType,
    #[serde(default)]
    pub(crate) amenities: Amenities,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MaintenanceRequest {
    pub(crate) maintenance_status: MaintenanceStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AllocationRequest {
    pub(crate) room_id: RoomId,
    pub(crate) due_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentRequest {
    pub(crate) amount: u64,
    pub(crate) method: PaymentMethod,
    pub(crate) transaction_id: String,
    #[serde(default)]
    pub(crate) paid_on: Option<NaiveDate>,
}

impl PaymentRequest {
    fn into_input(self) -> PaymentInput {
        PaymentInput {
            amount: self.amount,
            method: self.method,
            transaction_id: self.transaction_id,
            paid_on: today_or_local(self.paid_on),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DatedRequest {
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WalletCreditRequest {
    #[serde(flatten)]
    pub(crate) credit: WalletCredit,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WalletApplyRequest {
    pub(crate) fee_id: FeeId,
    #[serde(default)]
    pub(crate) amount: Option<u64>,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitChangeRequest {
    #[serde(flatten)]
    pub(crate) submission: RoomChangeSubmission,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReviewRequest {
    #[serde(default)]
    pub(crate) admin_notes: Option<String>,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectRequest {
    #[serde(default)]
    pub(crate) reason: String,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CancelRequest {
    #[serde(default)]
    pub(crate) student: Option<StudentId>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChangePaymentResponse {
    pub(crate) request: RoomChangeRequest,
    pub(crate) receipt: PaymentReceipt,
}

pub(crate) async fn quote_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Json(request): Json<QuoteRequest>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    let quote = service.quote(request.room_type, &request.amenities);
    (StatusCode::OK, Json(quote)).into_response()
}

pub(crate) async fn create_room_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Json(draft): Json<RoomDraft>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::CREATED, service.create_room(draft))
}

pub(crate) async fn room_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(room_id): Path<String>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::OK, service.get_room(&RoomId(room_id)))
}

pub(crate) async fn amenities_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(room_id): Path<String>,
    Json(amenities): Json<Amenities>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.update_amenities(&RoomId(room_id), amenities),
    )
}

pub(crate) async fn maintenance_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(room_id): Path<String>,
    Json(request): Json<MaintenanceRequest>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.set_maintenance(&RoomId(room_id), request.maintenance_status),
    )
}

pub(crate) async fn register_student_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Json(draft): Json<StudentDraft>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::CREATED, service.register_student(draft))
}

pub(crate) async fn student_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(student_id): Path<String>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::OK, service.get_student(&StudentId(student_id)))
}

pub(crate) async fn allocate_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(student_id): Path<String>,
    Json(request): Json<AllocationRequest>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::CREATED,
        service.allocate_room(&StudentId(student_id), &request.room_id, request.due_date),
    )
}

pub(crate) async fn vacate_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(student_id): Path<String>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::OK, service.vacate_room(&StudentId(student_id)))
}

pub(crate) async fn student_fees_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(student_id): Path<String>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.fees_for_student_as_of(&StudentId(student_id), today_or_local(None)),
    )
}

pub(crate) async fn wallet_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(student_id): Path<String>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::OK, service.wallet(&StudentId(student_id)))
}

pub(crate) async fn wallet_credit_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(student_id): Path<String>,
    Json(request): Json<WalletCreditRequest>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.credit_wallet(
            &StudentId(student_id),
            request.credit,
            today_or_local(request.today),
        ),
    )
}

pub(crate) async fn wallet_apply_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(student_id): Path<String>,
    Json(request): Json<WalletApplyRequest>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.apply_wallet_to_fee(
            &StudentId(student_id),
            &request.fee_id,
            request.amount,
            today_or_local(request.today),
        ),
    )
}

pub(crate) async fn assign_fee_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Json(assignment): Json<FeeAssignment>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::CREATED, service.assign_fee(assignment))
}

pub(crate) async fn fee_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(fee_id): Path<String>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.fee_as_of(&FeeId(fee_id), today_or_local(None)),
    )
}

pub(crate) async fn fee_payment_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(fee_id): Path<String>,
    Json(request): Json<PaymentRequest>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::CREATED,
        service.apply_payment(&FeeId(fee_id), request.into_input()),
    )
}

pub(crate) async fn late_fee_sweep_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    request: Option<Json<DatedRequest>>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    let Json(request) = request.unwrap_or_default();
    respond(
        StatusCode::OK,
        service.accrue_late_fees(today_or_local(request.today)),
    )
}

pub(crate) async fn submit_change_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Json(request): Json<SubmitChangeRequest>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::CREATED,
        service
            .room_changes()
            .submit(request.submission, today_or_local(request.today)),
    )
}

pub(crate) async fn room_change_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(request_id): Path<String>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.room_changes().get(&RoomChangeId(request_id)),
    )
}

pub(crate) async fn change_payment_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(request_id): Path<String>,
    Json(request): Json<PaymentRequest>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    let outcome = service
        .room_changes()
        .pay(&RoomChangeId(request_id), request.into_input())
        .map(|(request, receipt)| ChangePaymentResponse { request, receipt });
    respond(StatusCode::CREATED, outcome)
}

pub(crate) async fn review_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(request_id): Path<String>,
    request: Option<Json<ReviewRequest>>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    let Json(request) = request.unwrap_or_default();
    respond(
        StatusCode::OK,
        service.room_changes().begin_review(
            &RoomChangeId(request_id),
            request.admin_notes,
            today_or_local(request.today),
        ),
    )
}

pub(crate) async fn approve_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(request_id): Path<String>,
    request: Option<Json<ReviewRequest>>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    let Json(request) = request.unwrap_or_default();
    respond(
        StatusCode::OK,
        service.room_changes().approve(
            &RoomChangeId(request_id),
            request.admin_notes,
            today_or_local(request.today),
        ),
    )
}

pub(crate) async fn reject_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(request_id): Path<String>,
    Json(request): Json<RejectRequest>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.room_changes().reject(
            &RoomChangeId(request_id),
            &request.reason,
            today_or_local(request.today),
        ),
    )
}

pub(crate) async fn cancel_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(request_id): Path<String>,
    request: Option<Json<CancelRequest>>,
) -> Response
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    let Json(request) = request.unwrap_or_default();
    respond(
        StatusCode::OK,
        service
            .room_changes()
            .cancel(&RoomChangeId(request_id), request.student.as_ref()),
    )
}
