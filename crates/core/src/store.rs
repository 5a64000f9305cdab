//! The directory store: the authoritative in-memory registry of all domain
//! entities.
//!
//! One `DirectoryStore` instance is shared by every request handler. It owns
//! identity assignment (atomic counters, never derived from collection
//! length), uniqueness checks, and the persistence contract: every mutation
//! is mirrored through the [`Persist`] collaborator inside the same critical
//! section, and rolled back in memory if the durable write fails. Mutating
//! operations take the write lock for their whole read-check-then-write
//! sequence; read accessors take the read lock and return cloned snapshots,
//! so callers never observe a collection mid-mutation.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::models::{
    Appointment, Bill, Doctor, InventoryItem, MedicalRecord, Patient, Prescription,
};
use crate::persist::{EntityKind, Notify, Persist, PersistError};
use crate::validation::{require_non_empty, validate_date};
use crate::{ClinicError, ClinicResult};

/// Previously stored data used to seed a store at startup.
///
/// Produced by the persistence collaborator's bootstrap (e.g. loading the
/// JSON files written by earlier runs).
#[derive(Debug, Default, Clone)]
pub struct StoreSnapshot {
    pub patients: Vec<Patient>,
    pub doctors: Vec<Doctor>,
    pub appointments: Vec<Appointment>,
    pub medical_records: Vec<MedicalRecord>,
    pub prescriptions: Vec<Prescription>,
    pub bills: Vec<Bill>,
    pub inventory: Vec<InventoryItem>,
}

/// All collections, guarded together by one lock.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    pub(crate) patients: Vec<Patient>,
    pub(crate) doctors: Vec<Doctor>,
    pub(crate) appointments: Vec<Appointment>,
    pub(crate) medical_records: Vec<MedicalRecord>,
    pub(crate) prescriptions: Vec<Prescription>,
    pub(crate) bills: Vec<Bill>,
    pub(crate) inventory: Vec<InventoryItem>,
}

impl Registry {
    pub(crate) fn patient(&self, id: i64) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    pub(crate) fn doctor(&self, id: i64) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.id == id)
    }

    pub(crate) fn bill_index(&self, bill_id: i64) -> Option<usize> {
        self.bills.iter().position(|b| b.bill_id == bill_id)
    }
}

/// Monotonic identity counters, one per entity kind.
///
/// Ids are allocated before insertion and never reused; an operation that
/// rolls back simply leaves a gap in the sequence.
#[derive(Debug)]
struct IdCounters {
    patient: AtomicI64,
    doctor: AtomicI64,
    appointment: AtomicI64,
    medical_record: AtomicI64,
    prescription: AtomicI64,
    bill: AtomicI64,
}

impl IdCounters {
    fn starting_at(snapshot: &StoreSnapshot) -> Self {
        fn after<T>(items: &[T], id_of: impl Fn(&T) -> i64) -> AtomicI64 {
            AtomicI64::new(items.iter().map(id_of).max().unwrap_or(0) + 1)
        }

        Self {
            patient: after(&snapshot.patients, |p| p.id),
            doctor: after(&snapshot.doctors, |d| d.id),
            appointment: after(&snapshot.appointments, |a| a.id),
            medical_record: after(&snapshot.medical_records, |r| r.record_id),
            prescription: after(&snapshot.prescriptions, |p| p.prescription_id),
            bill: after(&snapshot.bills, |b| b.bill_id),
        }
    }
}

fn next(counter: &AtomicI64) -> i64 {
    counter.fetch_add(1, Ordering::Relaxed)
}

/// The shared registry of patients, doctors, appointments, bills, records,
/// prescriptions and inventory.
pub struct DirectoryStore {
    registry: RwLock<Registry>,
    ids: IdCounters,
    persist: Arc<dyn Persist>,
    notify: Arc<dyn Notify>,
}

impl DirectoryStore {
    /// Creates an empty store backed by the given collaborators.
    pub fn new(persist: Arc<dyn Persist>, notify: Arc<dyn Notify>) -> Self {
        Self::with_snapshot(StoreSnapshot::default(), persist, notify)
    }

    /// Creates a store seeded with previously stored data.
    ///
    /// Every id counter is advanced past the largest loaded id so freshly
    /// registered entities never collide with loaded ones.
    pub fn with_snapshot(
        snapshot: StoreSnapshot,
        persist: Arc<dyn Persist>,
        notify: Arc<dyn Notify>,
    ) -> Self {
        let ids = IdCounters::starting_at(&snapshot);
        let registry = Registry {
            patients: snapshot.patients,
            doctors: snapshot.doctors,
            appointments: snapshot.appointments,
            medical_records: snapshot.medical_records,
            prescriptions: snapshot.prescriptions,
            bills: snapshot.bills,
            inventory: snapshot.inventory,
        };

        Self {
            registry: RwLock::new(registry),
            ids,
            persist,
            notify,
        }
    }

    /// Acquires the write lock for a read-check-then-write sequence.
    ///
    /// A poisoned lock is recovered: writers mirror-then-commit or roll back
    /// before returning, so the registry is consistent even if a holder
    /// panicked.
    pub(crate) fn write_registry(&self) -> RwLockWriteGuard<'_, Registry> {
        match self.registry.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) fn read_registry(&self) -> RwLockReadGuard<'_, Registry> {
        match self.registry.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Mirrors one entity to durable storage.
    pub(crate) fn mirror<T: Serialize>(
        &self,
        kind: EntityKind,
        entity: &T,
    ) -> Result<(), PersistError> {
        let value = serde_json::to_value(entity).map_err(PersistError::Encode)?;
        self.persist.persist(kind, &value)
    }

    pub(crate) fn persist_collaborator(&self) -> &dyn Persist {
        self.persist.as_ref()
    }

    pub(crate) fn notify_collaborator(&self) -> &dyn Notify {
        self.notify.as_ref()
    }

    pub(crate) fn next_appointment_id(&self) -> i64 {
        next(&self.ids.appointment)
    }

    pub(crate) fn next_bill_id(&self) -> i64 {
        next(&self.ids.bill)
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Registers a new patient and returns it with its assigned id.
    ///
    /// A patient is insured exactly when an insurance company was named at
    /// registration.
    ///
    /// # Errors
    ///
    /// - `Validation` if name, address or medical history is empty.
    /// - `Persistence` if the durable mirror fails; the patient is not kept.
    pub fn register_patient(
        &self,
        name: &str,
        address: &str,
        medical_history: &str,
        insurance_company: Option<&str>,
    ) -> ClinicResult<Patient> {
        require_non_empty("name", name)?;
        require_non_empty("address", address)?;
        require_non_empty("medicalHistory", medical_history)?;

        let patient = Patient {
            id: next(&self.ids.patient),
            name: name.to_owned(),
            address: address.to_owned(),
            medical_history: medical_history.to_owned(),
            has_insurance: insurance_company.is_some(),
            insurance_company: insurance_company.unwrap_or_default().to_owned(),
        };

        let mut registry = self.write_registry();
        registry.patients.push(patient.clone());
        if let Err(err) = self.mirror(EntityKind::Patient, &patient) {
            registry.patients.pop();
            return Err(err.into());
        }

        tracing::info!(patient_id = patient.id, "patient registered");
        Ok(patient)
    }

    /// Registers a new doctor and returns it with its assigned id.
    ///
    /// # Errors
    ///
    /// - `Validation` if name, specialty or contact info is empty.
    /// - `Persistence` if the durable mirror fails; the doctor is not kept.
    pub fn register_doctor(
        &self,
        name: &str,
        specialty: &str,
        contact_info: &str,
    ) -> ClinicResult<Doctor> {
        require_non_empty("name", name)?;
        require_non_empty("specialty", specialty)?;
        require_non_empty("contactInfo", contact_info)?;

        let doctor = Doctor {
            id: next(&self.ids.doctor),
            name: name.to_owned(),
            specialty: specialty.to_owned(),
            contact_info: contact_info.to_owned(),
        };

        let mut registry = self.write_registry();
        registry.doctors.push(doctor.clone());
        if let Err(err) = self.mirror(EntityKind::Doctor, &doctor) {
            registry.doctors.pop();
            return Err(err.into());
        }

        tracing::info!(doctor_id = doctor.id, "doctor registered");
        Ok(doctor)
    }

    // ------------------------------------------------------------------
    // Records and prescriptions
    // ------------------------------------------------------------------

    /// Adds a visit note to a patient's history.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the patient or doctor is unknown.
    /// - `Validation` if the visit date is not `YYYY-MM-DD` or the notes are
    ///   empty.
    /// - `Persistence` on a failed durable mirror; the record is not kept.
    pub fn add_medical_record(
        &self,
        patient_id: i64,
        doctor_id: i64,
        visit_date: &str,
        notes: &str,
        diagnosis: &str,
    ) -> ClinicResult<MedicalRecord> {
        if !validate_date(visit_date) {
            return Err(ClinicError::Validation(
                "visitDate must have the form YYYY-MM-DD".into(),
            ));
        }
        require_non_empty("notes", notes)?;

        let mut registry = self.write_registry();
        if registry.patient(patient_id).is_none() {
            return Err(ClinicError::not_found("patient", patient_id));
        }
        if registry.doctor(doctor_id).is_none() {
            return Err(ClinicError::not_found("doctor", doctor_id));
        }

        let record = MedicalRecord {
            record_id: next(&self.ids.medical_record),
            patient_id,
            doctor_id,
            visit_date: visit_date.to_owned(),
            notes: notes.to_owned(),
            diagnosis: diagnosis.to_owned(),
        };

        registry.medical_records.push(record.clone());
        if let Err(err) = self.mirror(EntityKind::MedicalRecord, &record) {
            registry.medical_records.pop();
            return Err(err.into());
        }

        tracing::info!(record_id = record.record_id, patient_id, "medical record added");
        Ok(record)
    }

    /// Adds a prescription after validating that both the patient and the
    /// prescribing doctor exist.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the patient or doctor is unknown.
    /// - `Validation` on an empty medication/dosage or a malformed date.
    /// - `Persistence` on a failed durable mirror; the prescription is not
    ///   kept.
    pub fn add_prescription(
        &self,
        patient_id: i64,
        doctor_id: i64,
        medication: &str,
        dosage: &str,
        instructions: &str,
        date_prescribed: &str,
    ) -> ClinicResult<Prescription> {
        require_non_empty("medication", medication)?;
        require_non_empty("dosage", dosage)?;
        if !validate_date(date_prescribed) {
            return Err(ClinicError::Validation(
                "datePrescribed must have the form YYYY-MM-DD".into(),
            ));
        }

        let mut registry = self.write_registry();
        if registry.patient(patient_id).is_none() {
            return Err(ClinicError::not_found("patient", patient_id));
        }
        if registry.doctor(doctor_id).is_none() {
            return Err(ClinicError::not_found("doctor", doctor_id));
        }

        let prescription = Prescription {
            prescription_id: next(&self.ids.prescription),
            patient_id,
            doctor_id,
            medication: medication.to_owned(),
            dosage: dosage.to_owned(),
            instructions: instructions.to_owned(),
            date_prescribed: date_prescribed.to_owned(),
        };

        registry.prescriptions.push(prescription.clone());
        if let Err(err) = self.mirror(EntityKind::Prescription, &prescription) {
            registry.prescriptions.pop();
            return Err(err.into());
        }

        tracing::info!(
            prescription_id = prescription.prescription_id,
            patient_id,
            "prescription added"
        );
        Ok(prescription)
    }

    // ------------------------------------------------------------------
    // Lookups and listings
    // ------------------------------------------------------------------

    /// Looks up a patient by id.
    pub fn patient(&self, id: i64) -> ClinicResult<Patient> {
        self.read_registry()
            .patient(id)
            .cloned()
            .ok_or_else(|| ClinicError::not_found("patient", id))
    }

    /// Looks up a doctor by id.
    pub fn doctor(&self, id: i64) -> ClinicResult<Doctor> {
        self.read_registry()
            .doctor(id)
            .cloned()
            .ok_or_else(|| ClinicError::not_found("doctor", id))
    }

    /// Looks up a bill by id.
    pub fn bill(&self, id: i64) -> ClinicResult<Bill> {
        let registry = self.read_registry();
        registry
            .bill_index(id)
            .map(|i| registry.bills[i].clone())
            .ok_or_else(|| ClinicError::not_found("bill", id))
    }

    pub fn list_patients(&self) -> Vec<Patient> {
        self.read_registry().patients.clone()
    }

    pub fn list_doctors(&self) -> Vec<Doctor> {
        self.read_registry().doctors.clone()
    }

    pub fn list_appointments(&self) -> Vec<Appointment> {
        self.read_registry().appointments.clone()
    }

    pub fn list_bills(&self) -> Vec<Bill> {
        self.read_registry().bills.clone()
    }

    pub fn list_prescriptions(&self) -> Vec<Prescription> {
        self.read_registry().prescriptions.clone()
    }

    pub fn list_inventory(&self) -> Vec<InventoryItem> {
        self.read_registry().inventory.clone()
    }

    /// All appointments booked with one doctor.
    pub fn appointments_for_doctor(&self, doctor_id: i64) -> Vec<Appointment> {
        self.read_registry()
            .appointments
            .iter()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect()
    }

    /// All bills issued to one patient.
    pub fn bills_for_patient(&self, patient_id: i64) -> Vec<Bill> {
        self.read_registry()
            .bills
            .iter()
            .filter(|b| b.patient_id == patient_id)
            .cloned()
            .collect()
    }

    /// A patient's medical records.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the patient does not exist; an existing patient
    /// with no records yields an empty list.
    pub fn medical_history(&self, patient_id: i64) -> ClinicResult<Vec<MedicalRecord>> {
        let registry = self.read_registry();
        if registry.patient(patient_id).is_none() {
            return Err(ClinicError::not_found("patient", patient_id));
        }

        Ok(registry
            .medical_records
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory collaborator doubles shared by the core's test modules.

    use super::*;
    use serde_json::Value;
    use std::sync::Mutex;

    /// Records every persist/remove call and can be told to fail for one
    /// entity kind, to exercise rollback paths.
    #[derive(Default)]
    pub(crate) struct RecordingPersist {
        pub(crate) persisted: Mutex<Vec<(EntityKind, Value)>>,
        pub(crate) removed: Mutex<Vec<(EntityKind, crate::persist::RecordKey)>>,
        pub(crate) fail_on: Mutex<Option<EntityKind>>,
    }

    impl RecordingPersist {
        pub(crate) fn fail_on(&self, kind: EntityKind) {
            *self.fail_on.lock().unwrap() = Some(kind);
        }

        pub(crate) fn persisted_of(&self, kind: EntityKind) -> Vec<Value> {
            self.persisted
                .lock()
                .unwrap()
                .iter()
                .filter(|(k, _)| *k == kind)
                .map(|(_, v)| v.clone())
                .collect()
        }
    }

    impl Persist for RecordingPersist {
        fn persist(&self, kind: EntityKind, entity: &Value) -> Result<(), PersistError> {
            if *self.fail_on.lock().unwrap() == Some(kind) {
                return Err(PersistError::Backend(format!(
                    "injected failure persisting {kind}"
                )));
            }
            self.persisted.lock().unwrap().push((kind, entity.clone()));
            Ok(())
        }

        fn remove(
            &self,
            kind: EntityKind,
            key: &crate::persist::RecordKey,
        ) -> Result<(), PersistError> {
            self.removed.lock().unwrap().push((kind, key.clone()));
            Ok(())
        }
    }

    /// Records delivered notifications; can be told to fail.
    #[derive(Default)]
    pub(crate) struct RecordingNotify {
        pub(crate) messages: Mutex<Vec<(String, String)>>,
        pub(crate) fail: std::sync::atomic::AtomicBool,
    }

    impl Notify for RecordingNotify {
        fn notify(&self, item_name: &str, message: &str) -> Result<(), PersistError> {
            if self.fail.load(Ordering::Relaxed) {
                return Err(PersistError::Backend("injected notify failure".into()));
            }
            self.messages
                .lock()
                .unwrap()
                .push((item_name.to_owned(), message.to_owned()));
            Ok(())
        }
    }

    pub(crate) fn empty_store() -> (DirectoryStore, Arc<RecordingPersist>, Arc<RecordingNotify>) {
        let persist = Arc::new(RecordingPersist::default());
        let notify = Arc::new(RecordingNotify::default());
        let store = DirectoryStore::new(persist.clone(), notify.clone());
        (store, persist, notify)
    }

    /// A store with one insured patient, one uninsured patient and one
    /// doctor, which most scheduling and billing tests start from.
    pub(crate) fn seeded_store() -> (DirectoryStore, Arc<RecordingPersist>, Arc<RecordingNotify>) {
        let (store, persist, notify) = empty_store();
        store
            .register_patient("John", "NY", "SomeHistory", Some("XYZ"))
            .unwrap();
        store
            .register_patient("Mary", "LA", "None", None)
            .unwrap();
        store
            .register_doctor("DrSmith", "Surgery", "smith@clinic.example")
            .unwrap();
        (store, persist, notify)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_register_patient_assigns_monotonic_ids() {
        let (store, _, _) = empty_store();

        let first = store
            .register_patient("John", "NY", "SomeHistory", Some("XYZ"))
            .unwrap();
        let second = store
            .register_patient("Mary", "LA", "None", None)
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(first.has_insurance);
        assert_eq!(first.insurance_company, "XYZ");
        assert!(!second.has_insurance);
        assert_eq!(second.insurance_company, "");
    }

    #[test]
    fn test_register_patient_rejects_empty_required_fields() {
        let (store, _, _) = empty_store();

        let err = store
            .register_patient("", "NY", "SomeHistory", None)
            .expect_err("empty name");
        assert!(matches!(err, ClinicError::Validation(_)));

        let err = store
            .register_patient("John", "  ", "SomeHistory", None)
            .expect_err("blank address");
        assert!(matches!(err, ClinicError::Validation(_)));

        assert!(store.list_patients().is_empty());
    }

    #[test]
    fn test_register_patient_rolls_back_on_persist_failure() {
        let (store, persist, _) = empty_store();
        persist.fail_on(EntityKind::Patient);

        let err = store
            .register_patient("John", "NY", "SomeHistory", None)
            .expect_err("persist failure");

        assert!(matches!(err, ClinicError::Persistence(_)));
        assert!(store.list_patients().is_empty());

        // The burned id leaves a gap; the next registration must not reuse 1.
        *persist.fail_on.lock().unwrap() = None;
        let patient = store
            .register_patient("John", "NY", "SomeHistory", None)
            .unwrap();
        assert_eq!(patient.id, 2);
    }

    #[test]
    fn test_register_doctor_and_lookup() {
        let (store, _, _) = empty_store();

        let doctor = store
            .register_doctor("DrSmith", "Surgery", "smith@clinic.example")
            .unwrap();

        assert_eq!(store.doctor(doctor.id).unwrap(), doctor);
        assert!(matches!(
            store.doctor(99),
            Err(ClinicError::NotFound { entity: "doctor", id: 99 })
        ));
    }

    #[test]
    fn test_add_medical_record_requires_known_patient_and_doctor() {
        let (store, _, _) = seeded_store();

        let err = store
            .add_medical_record(99, 1, "2025-01-02", "checkup", "healthy")
            .expect_err("unknown patient");
        assert!(matches!(err, ClinicError::NotFound { entity: "patient", .. }));

        let err = store
            .add_medical_record(1, 99, "2025-01-02", "checkup", "healthy")
            .expect_err("unknown doctor");
        assert!(matches!(err, ClinicError::NotFound { entity: "doctor", .. }));

        let record = store
            .add_medical_record(1, 1, "2025-01-02", "checkup", "healthy")
            .unwrap();
        assert_eq!(record.record_id, 1);
        assert_eq!(store.medical_history(1).unwrap(), vec![record]);
    }

    #[test]
    fn test_add_medical_record_rejects_malformed_date() {
        let (store, _, _) = seeded_store();

        let err = store
            .add_medical_record(1, 1, "02-01-2025", "checkup", "healthy")
            .expect_err("bad date");
        assert!(matches!(err, ClinicError::Validation(msg) if msg.contains("visitDate")));
    }

    #[test]
    fn test_add_prescription_validates_both_parties() {
        let (store, persist, _) = seeded_store();

        let err = store
            .add_prescription(99, 1, "ABC", "1 tablet", "after meal", "2025-01-02")
            .expect_err("unknown patient");
        assert!(matches!(err, ClinicError::NotFound { entity: "patient", .. }));

        let prescription = store
            .add_prescription(1, 1, "ABC", "1 tablet", "after meal", "2025-01-02")
            .unwrap();
        assert_eq!(prescription.prescription_id, 1);
        assert_eq!(persist.persisted_of(EntityKind::Prescription).len(), 1);
    }

    #[test]
    fn test_medical_history_for_unknown_patient_is_not_found() {
        let (store, _, _) = empty_store();
        assert!(matches!(
            store.medical_history(1),
            Err(ClinicError::NotFound { entity: "patient", .. })
        ));
    }

    #[test]
    fn test_with_snapshot_resumes_id_sequences_past_loaded_ids() {
        let snapshot = StoreSnapshot {
            patients: vec![Patient {
                id: 7,
                name: "John".into(),
                address: "NY".into(),
                medical_history: "none".into(),
                has_insurance: false,
                insurance_company: String::new(),
            }],
            ..StoreSnapshot::default()
        };

        let persist = Arc::new(RecordingPersist::default());
        let notify = Arc::new(RecordingNotify::default());
        let store = DirectoryStore::with_snapshot(snapshot, persist, notify);

        let next = store
            .register_patient("Mary", "LA", "None", None)
            .unwrap();
        assert_eq!(next.id, 8);
        assert_eq!(store.list_patients().len(), 2);
    }
}
