use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::datastore::{PlantStore, StoreError};
use crate::plant::{CareLogEntry, CareTask, Plant};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Validation(String),

    #[error("no plant with id {0}")]
    PlantNotFound(String),

    #[error("no care task {task} on plant {plant}")]
    TaskNotFound { plant: String, task: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct PlantRepository<S: PlantStore> {
    store: S,
    plants: Vec<Plant>,
}

impl<S: PlantStore> PlantRepository<S> {
    #[tracing::instrument(skip(store, seed))]
    pub fn open(store: S, seed: Vec<Plant>) -> Result<Self, RepoError> {
        let plants = match store.load_all() {
            Ok(Some(stored)) => {
                let (merged, appended) = merge_seed(stored, seed);
                if appended > 0 {
                    info!(appended, "appended seed plants missing from storage");
                    store.save_all(&merged)?;
                }
                merged
            }
            Ok(None) => {
                info!(count = seed.len(), "no stored plants, seeding catalog");
                store.save_all(&seed)?;
                seed
            }
            Err(err @ StoreError::Parse { .. }) => {
                warn!(error = %err, "stored plants unreadable, falling back to seed catalog");
                seed
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self { store, plants })
    }

    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    pub fn plant_by_id(&self, id: &str) -> Option<&Plant> {
        self.plants.iter().find(|plant| plant.id == id)
    }

    #[tracing::instrument(skip_all, fields(name = %name))]
    pub fn add_plant(
        &mut self,
        name: String,
        kind: String,
        image_url: String,
        description: String,
    ) -> Result<Plant, RepoError> {
        if name.trim().is_empty() {
            return Err(RepoError::Validation(
                "plant name cannot be empty".to_string(),
            ));
        }
        if kind.trim().is_empty() {
            return Err(RepoError::Validation(
                "plant type cannot be empty".to_string(),
            ));
        }

        let plant = Plant::new(
            Uuid::new_v4().to_string(),
            name,
            kind,
            image_url,
            description,
        );
        self.plants.push(plant.clone());
        self.store.save_all(&self.plants)?;
        info!(id = %plant.id, "added plant");
        Ok(plant)
    }

    #[tracing::instrument(skip(self, updated), fields(id = %updated.id))]
    pub fn update_plant(&mut self, updated: Plant) -> Result<(), RepoError> {
        let Some(slot) = self
            .plants
            .iter_mut()
            .find(|plant| plant.id == updated.id)
        else {
            debug!("no plant matches update, ignoring");
            return Ok(());
        };

        *slot = updated;
        self.store.save_all(&self.plants)?;
        info!("updated plant");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_plant(&mut self, id: &str) -> Result<bool, RepoError> {
        let before = self.plants.len();
        self.plants.retain(|plant| plant.id != id);
        if self.plants.len() == before {
            debug!(id, "no plant to remove");
            return Ok(false);
        }

        self.store.save_all(&self.plants)?;
        info!(id, "removed plant");
        Ok(true)
    }

    #[tracing::instrument(skip(self, kind), fields(kind = %kind))]
    pub fn add_task(
        &mut self,
        plant_id: &str,
        kind: String,
        frequency_days: u32,
        now: DateTime<Utc>,
    ) -> Result<CareTask, RepoError> {
        if kind.trim().is_empty() {
            return Err(RepoError::Validation(
                "care task type cannot be empty".to_string(),
            ));
        }
        if frequency_days < 1 {
            return Err(RepoError::Validation(
                "care frequency must be at least one day".to_string(),
            ));
        }

        let plant = self
            .plants
            .iter_mut()
            .find(|plant| plant.id == plant_id)
            .ok_or_else(|| RepoError::PlantNotFound(plant_id.to_string()))?;

        let task = CareTask::new(Uuid::new_v4().to_string(), kind, frequency_days, now);
        plant.schedule.push(task.clone());
        self.store.save_all(&self.plants)?;
        info!(plant = plant_id, task = %task.id, "added care task");
        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_task(&mut self, plant_id: &str, task_id: &str) -> Result<bool, RepoError> {
        let Some(plant) = self.plants.iter_mut().find(|plant| plant.id == plant_id) else {
            debug!(plant = plant_id, "no plant to remove a task from");
            return Ok(false);
        };

        let before = plant.schedule.len();
        plant.schedule.retain(|task| task.id != task_id);
        if plant.schedule.len() == before {
            debug!(plant = plant_id, task = task_id, "no care task to remove");
            return Ok(false);
        }

        self.store.save_all(&self.plants)?;
        info!(plant = plant_id, task = task_id, "removed care task");
        Ok(true)
    }

    #[tracing::instrument(skip(self, notes, photo_url))]
    pub fn complete_task(
        &mut self,
        plant_id: &str,
        task_id: &str,
        notes: Option<String>,
        photo_url: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<CareLogEntry, RepoError> {
        let plant = self
            .plants
            .iter_mut()
            .find(|plant| plant.id == plant_id)
            .ok_or_else(|| RepoError::PlantNotFound(plant_id.to_string()))?;

        let task = plant
            .schedule
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or_else(|| RepoError::TaskNotFound {
                plant: plant_id.to_string(),
                task: task_id.to_string(),
            })?;

        task.last_completed = now;
        let entry = CareLogEntry {
            id: Uuid::new_v4().to_string(),
            task_type: task.kind.clone(),
            date: now,
            notes: Some(
                notes
                    .filter(|text| !text.is_empty())
                    .unwrap_or_else(|| format!("Completed '{}' task.", task.kind)),
            ),
            photo_url: photo_url.filter(|url| !url.is_empty()),
        };
        plant.log.push(entry.clone());

        self.store.save_all(&self.plants)?;
        info!(plant = plant_id, task = task_id, "completed care task");
        Ok(entry)
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_log(&mut self, plant_id: &str) -> Result<(), RepoError> {
        let plant = self
            .plants
            .iter_mut()
            .find(|plant| plant.id == plant_id)
            .ok_or_else(|| RepoError::PlantNotFound(plant_id.to_string()))?;

        plant.log.clear();
        self.store.save_all(&self.plants)?;
        info!(plant = plant_id, "cleared care log");
        Ok(())
    }
}

fn merge_seed(stored: Vec<Plant>, seed: Vec<Plant>) -> (Vec<Plant>, usize) {
    let mut plants = stored;
    let mut appended = 0usize;

    for plant in seed {
        if plants.iter().any(|existing| existing.id == plant.id) {
            continue;
        }
        plants.push(plant);
        appended += 1;
    }

    (plants, appended)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{PlantRepository, RepoError};
    use crate::datastore::{PlantStore, StoreError};
    use crate::plant::{CareTask, Plant};

    #[derive(Default)]
    struct MemStore {
        stored: RefCell<Option<Vec<Plant>>>,
        saves: RefCell<usize>,
    }

    impl MemStore {
        fn with(plants: Vec<Plant>) -> Self {
            Self {
                stored: RefCell::new(Some(plants)),
                saves: RefCell::new(0),
            }
        }

        fn save_count(&self) -> usize {
            *self.saves.borrow()
        }
    }

    impl PlantStore for MemStore {
        fn load_all(&self) -> Result<Option<Vec<Plant>>, StoreError> {
            Ok(self.stored.borrow().clone())
        }

        fn save_all(&self, plants: &[Plant]) -> Result<(), StoreError> {
            *self.stored.borrow_mut() = Some(plants.to_vec());
            *self.saves.borrow_mut() += 1;
            Ok(())
        }
    }

    struct FailingStore {
        stored: Vec<Plant>,
    }

    impl PlantStore for FailingStore {
        fn load_all(&self) -> Result<Option<Vec<Plant>>, StoreError> {
            Ok(Some(self.stored.clone()))
        }

        fn save_all(&self, _plants: &[Plant]) -> Result<(), StoreError> {
            Err(StoreError::Persist {
                path: "plants.data".to_string(),
                message: "disk full".to_string(),
            })
        }
    }

    struct CorruptStore;

    impl PlantStore for CorruptStore {
        fn load_all(&self) -> Result<Option<Vec<Plant>>, StoreError> {
            let bad = serde_json::from_str::<Plant>("{").expect_err("parse must fail");
            Err(StoreError::Parse {
                path: "plants.data".to_string(),
                line: 1,
                source: bad,
            })
        }

        fn save_all(&self, _plants: &[Plant]) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0)
            .single()
            .expect("valid date")
    }

    fn sample(id: &str) -> Plant {
        Plant::new(
            id.to_string(),
            format!("Plant {id}"),
            "Tropical".to_string(),
            "https://placehold.co/600x600.png".to_string(),
            String::new(),
        )
    }

    fn sample_with_task(plant_id: &str, task_id: &str) -> Plant {
        let mut plant = sample(plant_id);
        plant.schedule = vec![CareTask::new(
            task_id.to_string(),
            "Water".to_string(),
            7,
            now() - Duration::days(5),
        )];
        plant
    }

    #[test]
    fn seeds_catalog_on_first_run() {
        let store = MemStore::default();
        let repo = PlantRepository::open(store, vec![sample("1"), sample("2")])
            .expect("open repository");

        assert_eq!(repo.plants().len(), 2);
        assert_eq!(repo.store.save_count(), 1);
        let stored = repo.store.stored.borrow().clone().expect("stored plants");
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn merge_appends_missing_seed_plants() {
        let mut renamed = sample("1");
        renamed.name = "My Monstera".to_string();
        let store = MemStore::with(vec![renamed]);

        let repo = PlantRepository::open(store, vec![sample("1"), sample("2")])
            .expect("open repository");

        let ids: Vec<&str> = repo.plants().iter().map(|plant| plant.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(repo.plants()[0].name, "My Monstera");
        assert_eq!(repo.store.save_count(), 1);
    }

    #[test]
    fn merge_without_additions_does_not_save() {
        let store = MemStore::with(vec![sample("1"), sample("2")]);
        let repo = PlantRepository::open(store, vec![sample("1"), sample("2")])
            .expect("open repository");

        assert_eq!(repo.plants().len(), 2);
        assert_eq!(repo.store.save_count(), 0);
    }

    #[test]
    fn unreadable_store_falls_back_to_seed() {
        let repo = PlantRepository::open(CorruptStore, vec![sample("1")])
            .expect("open repository");
        assert_eq!(repo.plants().len(), 1);
    }

    #[test]
    fn add_plant_validates_name_and_kind() {
        let store = MemStore::with(vec![]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        let err = repo
            .add_plant(
                "  ".to_string(),
                "Fern".to_string(),
                String::new(),
                String::new(),
            )
            .expect_err("blank name must fail");
        assert!(matches!(err, RepoError::Validation(_)));

        let err = repo
            .add_plant(
                "Boston Fern".to_string(),
                String::new(),
                String::new(),
                String::new(),
            )
            .expect_err("blank type must fail");
        assert!(matches!(err, RepoError::Validation(_)));

        assert!(repo.plants().is_empty());
        assert_eq!(repo.store.save_count(), 0);
    }

    #[test]
    fn add_plant_assigns_fresh_id_and_saves() {
        let store = MemStore::with(vec![]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        let plant = repo
            .add_plant(
                "Boston Fern".to_string(),
                "Fern".to_string(),
                "https://placehold.co/600x600.png".to_string(),
                "Feathery fronds.".to_string(),
            )
            .expect("add plant");

        assert!(!plant.id.is_empty());
        assert!(plant.schedule.is_empty());
        assert!(plant.log.is_empty());
        assert_eq!(repo.plants().len(), 1);
        assert_eq!(repo.store.save_count(), 1);
    }

    #[test]
    fn update_plant_replaces_matching_record() {
        let store = MemStore::with(vec![sample("1")]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        let mut updated = sample("1");
        updated.name = "Renamed".to_string();
        repo.update_plant(updated).expect("update plant");

        assert_eq!(repo.plant_by_id("1").map(|plant| plant.name.as_str()), Some("Renamed"));
        assert_eq!(repo.store.save_count(), 1);
    }

    #[test]
    fn update_plant_ignores_unknown_id() {
        let store = MemStore::with(vec![sample("1")]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        repo.update_plant(sample("ghost")).expect("update is a no-op");

        assert_eq!(repo.plants().len(), 1);
        assert_eq!(repo.store.save_count(), 0);
    }

    #[test]
    fn remove_plant_is_idempotent() {
        let store = MemStore::with(vec![sample("1")]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        assert!(repo.remove_plant("1").expect("first remove"));
        assert!(!repo.remove_plant("1").expect("second remove"));
        assert_eq!(repo.store.save_count(), 1);
    }

    #[test]
    fn add_task_rejects_zero_frequency() {
        let store = MemStore::with(vec![sample("1")]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        let err = repo
            .add_task("1", "Water".to_string(), 0, now())
            .expect_err("zero frequency must fail");
        assert!(matches!(err, RepoError::Validation(_)));

        let plant = repo.plant_by_id("1").expect("plant");
        assert!(plant.schedule.is_empty());
        assert_eq!(repo.store.save_count(), 0);
    }

    #[test]
    fn add_task_rejects_blank_type() {
        let store = MemStore::with(vec![sample("1")]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        let err = repo
            .add_task("1", "  ".to_string(), 7, now())
            .expect_err("blank type must fail");
        assert!(matches!(err, RepoError::Validation(_)));
        assert_eq!(repo.store.save_count(), 0);
    }

    #[test]
    fn add_task_requires_existing_plant() {
        let store = MemStore::with(vec![]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        let err = repo
            .add_task("ghost", "Water".to_string(), 7, now())
            .expect_err("unknown plant must fail");
        assert!(matches!(err, RepoError::PlantNotFound(_)));
    }

    #[test]
    fn add_task_starts_the_cycle_at_now() {
        let store = MemStore::with(vec![sample("1")]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        let task = repo
            .add_task("1", "Water".to_string(), 7, now())
            .expect("add task");

        assert_eq!(task.last_completed, now());
        assert!(!task.is_due(now()));
        assert!(task.is_due(now() + Duration::days(7)));
        assert_eq!(repo.store.save_count(), 1);
    }

    #[test]
    fn remove_task_is_idempotent() {
        let store = MemStore::with(vec![sample_with_task("1", "t1")]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        assert!(repo.remove_task("1", "t1").expect("first remove"));
        assert!(!repo.remove_task("1", "t1").expect("second remove"));
        assert!(!repo.remove_task("ghost", "t1").expect("unknown plant"));
        assert_eq!(repo.store.save_count(), 1);
    }

    #[test]
    fn complete_task_advances_and_logs_atomically() {
        let store = MemStore::with(vec![sample_with_task("1", "t1")]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        let entry = repo
            .complete_task("1", "t1", None, None, now())
            .expect("complete task");

        assert_eq!(entry.task_type, "Water");
        assert_eq!(entry.date, now());
        assert_eq!(entry.notes.as_deref(), Some("Completed 'Water' task."));
        assert!(entry.photo_url.is_none());

        let plant = repo.plant_by_id("1").expect("plant");
        assert_eq!(plant.schedule[0].last_completed, now());
        assert_eq!(plant.log.len(), 1);
        assert_eq!(repo.store.save_count(), 1);
    }

    #[test]
    fn complete_task_keeps_notes_and_photo() {
        let store = MemStore::with(vec![sample_with_task("1", "t1")]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        let entry = repo
            .complete_task(
                "1",
                "t1",
                Some("Soil was dry to the touch.".to_string()),
                Some("https://example.com/after.jpg".to_string()),
                now(),
            )
            .expect("complete task");

        assert_eq!(entry.notes.as_deref(), Some("Soil was dry to the touch."));
        assert_eq!(entry.photo_url.as_deref(), Some("https://example.com/after.jpg"));
    }

    #[test]
    fn complete_task_defaults_empty_notes() {
        let store = MemStore::with(vec![sample_with_task("1", "t1")]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        let entry = repo
            .complete_task("1", "t1", Some(String::new()), None, now())
            .expect("complete task");
        assert_eq!(entry.notes.as_deref(), Some("Completed 'Water' task."));
    }

    #[test]
    fn complete_task_drops_a_blank_photo() {
        let store = MemStore::with(vec![sample_with_task("1", "t1")]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        let entry = repo
            .complete_task("1", "t1", None, Some(String::new()), now())
            .expect("complete task");

        assert_eq!(entry.photo_url, None);
        assert_eq!(repo.plant_by_id("1").expect("plant").log[0].photo_url, None);
    }

    #[test]
    fn complete_task_with_stale_id_changes_nothing() {
        let store = MemStore::with(vec![sample_with_task("1", "t1")]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        let err = repo
            .complete_task("1", "gone", None, None, now())
            .expect_err("stale task id must fail");
        assert!(matches!(err, RepoError::TaskNotFound { .. }));

        let plant = repo.plant_by_id("1").expect("plant");
        assert!(plant.log.is_empty());
        assert_eq!(plant.schedule[0].last_completed, now() - Duration::days(5));
        assert_eq!(repo.store.save_count(), 0);

        let err = repo
            .complete_task("ghost", "t1", None, None, now())
            .expect_err("unknown plant must fail");
        assert!(matches!(err, RepoError::PlantNotFound(_)));
    }

    #[test]
    fn clear_log_requires_existing_plant() {
        let store = MemStore::with(vec![sample_with_task("1", "t1")]);
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        repo.complete_task("1", "t1", None, None, now())
            .expect("complete task");
        repo.clear_log("1").expect("clear log");
        assert!(repo.plant_by_id("1").expect("plant").log.is_empty());

        let err = repo.clear_log("ghost").expect_err("unknown plant must fail");
        assert!(matches!(err, RepoError::PlantNotFound(_)));
    }

    #[test]
    fn persist_failure_keeps_the_mutation_in_memory() {
        let store = FailingStore {
            stored: vec![sample("1")],
        };
        let mut repo = PlantRepository::open(store, vec![]).expect("open repository");

        let err = repo
            .add_task("1", "Water".to_string(), 7, now())
            .expect_err("save must fail");
        assert!(matches!(err, RepoError::Store(_)));

        let plant = repo.plant_by_id("1").expect("plant");
        assert_eq!(plant.schedule.len(), 1);
    }
}
