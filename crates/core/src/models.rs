//! Domain entities held by the directory store.
//!
//! Serialized field names are fixed by the existing stored data
//! (`patients.json`, `bills.json`, ...) and must not drift: any rename here
//! breaks compatibility with records written by earlier deployments.

use serde::{Deserialize, Serialize};

/// A registered patient. Immutable after registration apart from the
/// insurance fields, which are copied onto each new bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub address: String,
    #[serde(rename = "medicalHistory")]
    pub medical_history: String,
    #[serde(rename = "hasInsurance")]
    pub has_insurance: bool,
    #[serde(rename = "insuranceCompany")]
    pub insurance_company: String,
}

/// A registered doctor. Immutable after registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialty: String,
    #[serde(rename = "contactInfo")]
    pub contact_info: String,
}

/// A booked slot. Appointments are never mutated or cancelled; a slot is
/// exclusive per (doctor, date, time), not globally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    #[serde(rename = "patientId")]
    pub patient_id: i64,
    #[serde(rename = "doctorId")]
    pub doctor_id: i64,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Time of day, `HH:MM`, on a legal 10-minute slot.
    pub time: String,
}

/// A visit note attached to a patient's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalRecord {
    #[serde(rename = "recordId")]
    pub record_id: i64,
    #[serde(rename = "patientId")]
    pub patient_id: i64,
    #[serde(rename = "doctorId")]
    pub doctor_id: i64,
    #[serde(rename = "visitDate")]
    pub visit_date: String,
    pub notes: String,
    pub diagnosis: String,
}

/// A medication prescribed to a patient by a doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    #[serde(rename = "prescriptionId")]
    pub prescription_id: i64,
    #[serde(rename = "patientId")]
    pub patient_id: i64,
    #[serde(rename = "doctorId")]
    pub doctor_id: i64,
    pub medication: String,
    pub dosage: String,
    pub instructions: String,
    #[serde(rename = "datePrescribed")]
    pub date_prescribed: String,
}

/// Insurance claim lifecycle attached to a bill.
///
/// Transitions run strictly forward: `NotSubmitted` -> `Pending` ->
/// `Approved` or `Denied`. The settled states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    NotSubmitted,
    Pending,
    Approved,
    Denied,
}

impl ClaimStatus {
    /// Whether the claim has reached a settled state.
    pub fn is_terminal(self) -> bool {
        matches!(self, ClaimStatus::Approved | ClaimStatus::Denied)
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClaimStatus::NotSubmitted => "NotSubmitted",
            ClaimStatus::Pending => "Pending",
            ClaimStatus::Approved => "Approved",
            ClaimStatus::Denied => "Denied",
        };
        f.write_str(s)
    }
}

/// The bill created for an appointment at booking time.
///
/// Exactly one bill exists per appointment. `total_fee` is always the sum of
/// the three fee components, recomputed on every fee mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    #[serde(rename = "billId")]
    pub bill_id: i64,
    #[serde(rename = "patientId")]
    pub patient_id: i64,
    #[serde(rename = "appointmentId")]
    pub appointment_id: i64,
    #[serde(rename = "medicationFee")]
    pub medication_fee: f64,
    #[serde(rename = "consultationFee")]
    pub consultation_fee: f64,
    #[serde(rename = "surgeryFee")]
    pub surgery_fee: f64,
    #[serde(rename = "totalFee")]
    pub total_fee: f64,
    #[serde(rename = "isInsured")]
    pub is_insured: bool,
    pub claimed: bool,
    #[serde(rename = "insuranceCompany")]
    pub insurance_company: String,
    #[serde(rename = "claimStatus")]
    pub claim_status: ClaimStatus,
}

impl Bill {
    /// Recomputes `total_fee` from the three components.
    pub(crate) fn recompute_total(&mut self) {
        self.total_fee = self.medication_fee + self.consultation_fee + self.surgery_fee;
    }
}

/// A stocked item, unique by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(rename = "itemName")]
    pub item_name: String,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_status_serializes_to_stored_strings() {
        assert_eq!(
            serde_json::to_string(&ClaimStatus::NotSubmitted).unwrap(),
            "\"NotSubmitted\""
        );
        assert_eq!(
            serde_json::to_string(&ClaimStatus::Pending).unwrap(),
            "\"Pending\""
        );
        let status: ClaimStatus = serde_json::from_str("\"Approved\"").unwrap();
        assert_eq!(status, ClaimStatus::Approved);
    }

    #[test]
    fn test_bill_round_trips_with_stored_field_names() {
        let bill = Bill {
            bill_id: 3,
            patient_id: 1,
            appointment_id: 2,
            medication_fee: 10.0,
            consultation_fee: 20.0,
            surgery_fee: 0.0,
            total_fee: 30.0,
            is_insured: true,
            claimed: false,
            insurance_company: "XYZ".into(),
            claim_status: ClaimStatus::NotSubmitted,
        };

        let value = serde_json::to_value(&bill).unwrap();
        assert_eq!(value["billId"], 3);
        assert_eq!(value["medicationFee"], 10.0);
        assert_eq!(value["isInsured"], true);
        assert_eq!(value["claimStatus"], "NotSubmitted");

        let back: Bill = serde_json::from_value(value).unwrap();
        assert_eq!(back, bill);
    }

    #[test]
    fn test_patient_uses_camel_case_stored_fields() {
        let value = serde_json::to_value(Patient {
            id: 1,
            name: "John".into(),
            address: "NY".into(),
            medical_history: "none".into(),
            has_insurance: true,
            insurance_company: "XYZ".into(),
        })
        .unwrap();

        assert_eq!(value["medicalHistory"], "none");
        assert_eq!(value["hasInsurance"], true);
        assert_eq!(value["insuranceCompany"], "XYZ");
    }
}
