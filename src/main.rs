use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic_core::{ClinicError, DirectoryStore};
use clinic_files::JsonFileStore;

/// Application state shared across REST API handlers.
///
/// Holds the one directory store instance every request executes against.
#[derive(Clone)]
struct AppState {
    store: Arc<DirectoryStore>,
}

type HandlerResult = Result<Json<Value>, (StatusCode, String)>;

/// Main entry point for the clinic application.
///
/// Loads previously stored data from the JSON data directory, seeds the
/// directory store with it, and serves the REST API.
///
/// # Environment Variables
/// - `CLINIC_ADDR`: REST server address (default: "0.0.0.0:8080")
/// - `CLINIC_DATA_DIR`: Directory for stored JSON collections (default: "clinic_data")
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = std::env::var("CLINIC_DATA_DIR").unwrap_or_else(|_| "clinic_data".into());
    let addr = std::env::var("CLINIC_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());

    let files = Arc::new(JsonFileStore::new(data_dir.as_str())?);
    let snapshot = files.load_snapshot()?;
    tracing::info!(
        data_dir,
        patients = snapshot.patients.len(),
        appointments = snapshot.appointments.len(),
        "loaded stored data"
    );

    let store = Arc::new(DirectoryStore::with_snapshot(
        snapshot,
        files.clone(),
        files.clone(),
    ));

    let app = Router::new()
        .route("/", get(home))
        .route("/register", get(register_patient))
        .route("/register_doctor", get(register_doctor))
        .route("/book_appointment", get(book_appointment))
        .route("/patients", get(list_patients))
        .route("/doctors", get(list_doctors))
        .route("/appointments", get(list_appointments))
        .route("/bills", get(list_bills))
        .route("/add_medical_record", get(add_medical_record))
        .route("/medical_history", get(medical_history))
        .route("/add_prescription", get(add_prescription))
        .route("/update_bill", get(update_bill))
        .route("/ask_for_billing", get(submit_claim))
        .route("/approve_insurance", get(approve_claim))
        .route("/deny_insurance", get(deny_claim))
        .route("/inventory", get(list_inventory))
        .route("/update_inventory_item", get(update_inventory_item))
        .layer(CorsLayer::permissive())
        .with_state(AppState { store });

    tracing::info!("++ Starting clinic REST on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Maps core errors onto client-facing statuses: bad input -> 400, unknown
/// entity -> 404, scheduling conflict -> 409, persistence failure -> 500.
fn error_response(err: ClinicError) -> (StatusCode, String) {
    let status = match &err {
        ClinicError::Validation(_) | ClinicError::InvalidState(_) => StatusCode::BAD_REQUEST,
        ClinicError::NotFound { .. } => StatusCode::NOT_FOUND,
        ClinicError::SlotTaken { .. } => StatusCode::CONFLICT,
        ClinicError::Persistence(_) => {
            tracing::error!(%err, "request failed on durable write");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

async fn home() -> &'static str {
    "Welcome to the Clinic Operations Backend."
}

#[derive(Deserialize)]
struct RegisterPatientParams {
    name: String,
    address: String,
    #[serde(rename = "medicalHistory")]
    medical_history: String,
    #[serde(rename = "insuranceCompany")]
    insurance_company: Option<String>,
}

async fn register_patient(
    State(state): State<AppState>,
    Query(params): Query<RegisterPatientParams>,
) -> HandlerResult {
    let patient = state
        .store
        .register_patient(
            &params.name,
            &params.address,
            &params.medical_history,
            params.insurance_company.as_deref(),
        )
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Patient registered successfully",
        "id": patient.id,
    })))
}

#[derive(Deserialize)]
struct RegisterDoctorParams {
    name: String,
    specialty: String,
    #[serde(rename = "contactInfo")]
    contact_info: String,
}

async fn register_doctor(
    State(state): State<AppState>,
    Query(params): Query<RegisterDoctorParams>,
) -> HandlerResult {
    let doctor = state
        .store
        .register_doctor(&params.name, &params.specialty, &params.contact_info)
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Doctor registered successfully",
        "id": doctor.id,
    })))
}

#[derive(Deserialize)]
struct BookAppointmentParams {
    #[serde(rename = "patientId")]
    patient_id: i64,
    #[serde(rename = "doctorId")]
    doctor_id: i64,
    date: String,
    time: String,
}

async fn book_appointment(
    State(state): State<AppState>,
    Query(params): Query<BookAppointmentParams>,
) -> HandlerResult {
    let confirmation = state
        .store
        .book_appointment(params.patient_id, params.doctor_id, &params.date, &params.time)
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Appointment and bill created successfully",
        "appointmentId": confirmation.appointment_id,
        "billId": confirmation.bill_id,
    })))
}

async fn list_patients(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "patients": state.store.list_patients() }))
}

async fn list_doctors(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "doctors": state.store.list_doctors() }))
}

async fn list_appointments(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "appointments": state.store.list_appointments() }))
}

async fn list_bills(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "bills": state.store.list_bills() }))
}

async fn list_inventory(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "inventory": state.store.list_inventory() }))
}

#[derive(Deserialize)]
struct AddMedicalRecordParams {
    #[serde(rename = "patientId")]
    patient_id: i64,
    #[serde(rename = "doctorId")]
    doctor_id: i64,
    #[serde(rename = "visitDate")]
    visit_date: String,
    notes: String,
    #[serde(default)]
    diagnosis: String,
}

async fn add_medical_record(
    State(state): State<AppState>,
    Query(params): Query<AddMedicalRecordParams>,
) -> HandlerResult {
    let record = state
        .store
        .add_medical_record(
            params.patient_id,
            params.doctor_id,
            &params.visit_date,
            &params.notes,
            &params.diagnosis,
        )
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Medical record added successfully",
        "recordId": record.record_id,
    })))
}

#[derive(Deserialize)]
struct MedicalHistoryParams {
    #[serde(rename = "patientId")]
    patient_id: i64,
}

async fn medical_history(
    State(state): State<AppState>,
    Query(params): Query<MedicalHistoryParams>,
) -> HandlerResult {
    let records = state
        .store
        .medical_history(params.patient_id)
        .map_err(error_response)?;

    Ok(Json(json!({ "medicalRecords": records })))
}

#[derive(Deserialize)]
struct AddPrescriptionParams {
    #[serde(rename = "patientId")]
    patient_id: i64,
    #[serde(rename = "doctorId")]
    doctor_id: i64,
    medication: String,
    dosage: String,
    instructions: String,
    #[serde(rename = "datePrescribed")]
    date_prescribed: String,
}

async fn add_prescription(
    State(state): State<AppState>,
    Query(params): Query<AddPrescriptionParams>,
) -> HandlerResult {
    let prescription = state
        .store
        .add_prescription(
            params.patient_id,
            params.doctor_id,
            &params.medication,
            &params.dosage,
            &params.instructions,
            &params.date_prescribed,
        )
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Prescription added successfully",
        "prescriptionId": prescription.prescription_id,
    })))
}

#[derive(Deserialize)]
struct UpdateBillParams {
    #[serde(rename = "billId")]
    bill_id: i64,
    #[serde(rename = "medicationFee")]
    medication_fee: Option<f64>,
    #[serde(rename = "consultationFee")]
    consultation_fee: Option<f64>,
    #[serde(rename = "surgeryFee")]
    surgery_fee: Option<f64>,
}

async fn update_bill(
    State(state): State<AppState>,
    Query(params): Query<UpdateBillParams>,
) -> HandlerResult {
    let bill = state
        .store
        .update_fees(
            params.bill_id,
            params.medication_fee,
            params.consultation_fee,
            params.surgery_fee,
        )
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Bill updated successfully",
        "billId": bill.bill_id,
        "totalFee": bill.total_fee,
    })))
}

#[derive(Deserialize)]
struct BillIdParams {
    #[serde(rename = "billId")]
    bill_id: i64,
}

async fn submit_claim(
    State(state): State<AppState>,
    Query(params): Query<BillIdParams>,
) -> HandlerResult {
    let bill = state
        .store
        .submit_claim(params.bill_id)
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Insurance claim submitted",
        "billId": bill.bill_id,
        "claimStatus": bill.claim_status,
    })))
}

async fn approve_claim(
    State(state): State<AppState>,
    Query(params): Query<BillIdParams>,
) -> HandlerResult {
    let bill = state
        .store
        .approve_claim(params.bill_id)
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Claim approved successfully",
        "billId": bill.bill_id,
        "claimStatus": bill.claim_status,
    })))
}

async fn deny_claim(
    State(state): State<AppState>,
    Query(params): Query<BillIdParams>,
) -> HandlerResult {
    let bill = state
        .store
        .deny_claim(params.bill_id)
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Claim denied",
        "billId": bill.bill_id,
        "claimStatus": bill.claim_status,
    })))
}

#[derive(Deserialize)]
struct UpdateInventoryParams {
    #[serde(rename = "itemName")]
    item_name: String,
    quantity: i64,
}

async fn update_inventory_item(
    State(state): State<AppState>,
    Query(params): Query<UpdateInventoryParams>,
) -> HandlerResult {
    let item = state
        .store
        .set_inventory_quantity(&params.item_name, params.quantity)
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Inventory updated successfully",
        "itemName": item.item_name,
        "quantity": item.quantity,
    })))
}
