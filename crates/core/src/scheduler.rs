//! Appointment booking.
//!
//! Booking is the one multi-step mutation in the system: the slot-conflict
//! check, the appointment insert and the bill insert all happen under a
//! single acquisition of the registry write lock. Two concurrent bookings of
//! the same (doctor, date, time) therefore serialize, and exactly one wins.

use crate::models::{Appointment, Bill, ClaimStatus};
use crate::persist::{EntityKind, RecordKey};
use crate::store::DirectoryStore;
use crate::validation::{validate_appointment_time, validate_date};
use crate::{ClinicError, ClinicResult};

/// The identities created by a successful booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingConfirmation {
    pub appointment_id: i64,
    pub bill_id: i64,
}

impl DirectoryStore {
    /// Books an appointment and, as one logical unit, creates its bill.
    ///
    /// The bill starts with all fees at zero, insurance fields copied from
    /// the patient, and an unsubmitted claim. Exactly one bill exists per
    /// appointment: if the bill cannot be committed, the already-committed
    /// appointment is rolled back in memory and removed from durable storage
    /// (compensating action).
    ///
    /// Slot comparison is exact value equality on (doctorId, date, time);
    /// inputs must already be in canonical form, which the format checks
    /// enforce.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the patient or doctor is unknown.
    /// - `Validation` if the date is not `YYYY-MM-DD` or the time is not a
    ///   legal 10-minute slot within business hours.
    /// - `SlotTaken` if the doctor already has an appointment at that date
    ///   and time, regardless of which patient booked it.
    /// - `Persistence` if a durable write fails; no partial state survives.
    pub fn book_appointment(
        &self,
        patient_id: i64,
        doctor_id: i64,
        date: &str,
        time: &str,
    ) -> ClinicResult<BookingConfirmation> {
        // One critical section covers the existence checks, the conflict
        // check and both inserts.
        let mut registry = self.write_registry();

        let Some(patient) = registry.patient(patient_id).cloned() else {
            return Err(ClinicError::not_found("patient", patient_id));
        };
        if registry.doctor(doctor_id).is_none() {
            return Err(ClinicError::not_found("doctor", doctor_id));
        }

        if !validate_date(date) {
            return Err(ClinicError::Validation(
                "date must have the form YYYY-MM-DD".into(),
            ));
        }
        if !validate_appointment_time(time) {
            return Err(ClinicError::Validation(
                "time must be a 10-minute slot between 09:00 and 17:00".into(),
            ));
        }

        let slot_taken = registry
            .appointments
            .iter()
            .any(|a| a.doctor_id == doctor_id && a.date == date && a.time == time);
        if slot_taken {
            return Err(ClinicError::SlotTaken {
                doctor_id,
                date: date.to_owned(),
                time: time.to_owned(),
            });
        }

        let appointment = Appointment {
            id: self.next_appointment_id(),
            patient_id,
            doctor_id,
            date: date.to_owned(),
            time: time.to_owned(),
        };
        let appointment_id = appointment.id;

        registry.appointments.push(appointment.clone());
        if let Err(err) = self.mirror(EntityKind::Appointment, &appointment) {
            registry.appointments.pop();
            return Err(err.into());
        }

        let bill = Bill {
            bill_id: self.next_bill_id(),
            patient_id,
            appointment_id,
            medication_fee: 0.0,
            consultation_fee: 0.0,
            surgery_fee: 0.0,
            total_fee: 0.0,
            is_insured: patient.has_insurance,
            claimed: false,
            insurance_company: patient.insurance_company.clone(),
            claim_status: ClaimStatus::NotSubmitted,
        };
        let bill_id = bill.bill_id;

        registry.bills.push(bill.clone());
        if let Err(err) = self.mirror(EntityKind::Bill, &bill) {
            // Compensating rollback: a bill-less appointment must not
            // survive, in memory or on disk.
            registry.bills.pop();
            registry.appointments.pop();
            if let Err(remove_err) = self
                .persist_collaborator()
                .remove(EntityKind::Appointment, &RecordKey::Id(appointment_id))
            {
                tracing::error!(
                    appointment_id,
                    %remove_err,
                    "failed to remove orphaned appointment from durable storage"
                );
            }
            return Err(err.into());
        }

        tracing::info!(appointment_id, bill_id, patient_id, doctor_id, "appointment booked");
        Ok(BookingConfirmation {
            appointment_id,
            bill_id,
        })
    }
}
