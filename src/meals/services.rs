use anyhow::Context;
use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use super::repo::{self, Meal};
use crate::ai::{normalize_totals, prompts::DEFAULT_MEAL_NAME, NutrientTotals, Parsed};
use crate::state::AppState;
use crate::storage::meal_photo_key;

const PHOTO_URL_TTL_SECS: u64 = 10 * 60;

pub async fn create_meal(
    st: &AppState,
    user_id: &str,
    meal_name: Option<String>,
    foods: Vec<Value>,
    totals: Value,
) -> anyhow::Result<Meal> {
    let meal_name = meal_name_or_default(meal_name);
    let totals = totals_from_client(totals);

    let meal = repo::insert(&st.db, user_id, &meal_name, &foods, &totals).await?;
    info!(meal_id = %meal.id, user_id = %meal.user_id, foods = foods.len(), "meal saved");
    Ok(meal)
}

/// Trimmed client name, or the default when missing or blank.
fn meal_name_or_default(meal_name: Option<String>) -> String {
    meal_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_MEAL_NAME.to_string())
}

/// Accept the nutrient-sheet response as-is or the bare totals object.
fn totals_from_client(totals: Value) -> NutrientTotals {
    match totals {
        Value::Object(map) if map.contains_key("totals") => normalize_totals(Parsed::Object(map)),
        other => {
            let mut root = Map::new();
            root.insert("totals".into(), other);
            normalize_totals(Parsed::Object(root))
        }
    }
}

/// Returns `false` when the meal does not exist for this user.
pub async fn delete_meal(st: &AppState, user_id: &str, meal_id: Uuid) -> anyhow::Result<bool> {
    let Some(photo_key) = repo::delete(&st.db, user_id, meal_id).await? else {
        return Ok(false);
    };
    if let Some(key) = photo_key {
        discard_photo(st, &key).await;
    }
    info!(%meal_id, %user_id, "meal deleted");
    Ok(true)
}

/// Store a photo for an existing meal. `None` when the meal does not exist.
pub async fn attach_photo(
    st: &AppState,
    user_id: &str,
    meal_id: Uuid,
    body: Bytes,
    content_type: &str,
) -> anyhow::Result<Option<String>> {
    if repo::find(&st.db, user_id, meal_id).await?.is_none() {
        return Ok(None);
    }

    let key = meal_photo_key(user_id, meal_id, content_type);
    st.storage
        .put_object(&key, body, content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    match repo::replace_photo_key(&st.db, user_id, meal_id, &key).await {
        Ok(Some(previous)) => {
            if let Some(old) = previous {
                discard_photo(st, &old).await;
            }
            Ok(Some(key))
        }
        Ok(None) => {
            // deleted between the lookup and the update
            discard_photo(st, &key).await;
            Ok(None)
        }
        Err(e) => {
            discard_photo(st, &key).await;
            Err(e)
        }
    }
}

async fn discard_photo(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, %key, "orphaned meal photo");
    }
}

pub async fn presign_photo(st: &AppState, photo_key: &str) -> anyhow::Result<String> {
    st.storage
        .presign_get(photo_key, PHOTO_URL_TTL_SECS)
        .await
        .with_context(|| format!("presign url for {}", photo_key))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use sqlx::PgPool;

    use super::*;
    use crate::storage::{memory::MemoryStorage, StorageClient};

    #[test]
    fn blank_or_missing_names_become_custom_meal() {
        assert_eq!(meal_name_or_default(None), "Custom Meal");
        assert_eq!(meal_name_or_default(Some("   ".into())), "Custom Meal");
        assert_eq!(meal_name_or_default(Some(" Oatmeal Bowl \n".into())), "Oatmeal Bowl");
    }

    #[test]
    fn wrapped_totals_are_unwrapped() {
        let totals = totals_from_client(json!({
            "totals": {"macronutrients": {"calories": 500}}
        }));
        assert_eq!(totals.macro_value("calories"), Some(500.0));
        assert!(totals.micronutrients.is_empty());
    }

    #[test]
    fn bare_totals_are_accepted() {
        let totals = totals_from_client(json!({
            "macronutrients": {"protein": 30},
            "micronutrients": {"iron_mg": 2}
        }));
        assert_eq!(totals.macro_value("protein"), Some(30.0));
        assert_eq!(Value::Object(totals.micronutrients), json!({"iron_mg": 2}));
    }

    #[test]
    fn missing_totals_are_empty() {
        assert_eq!(totals_from_client(Value::Null), NutrientTotals::default());
        assert_eq!(totals_from_client(json!("x")), NutrientTotals::default());
    }

    #[tokio::test]
    async fn photo_urls_are_presigned_for_ten_minutes() {
        let state = AppState::fake();
        let url = presign_photo(&state, "meals/u/m.jpg").await.unwrap();
        assert_eq!(url, "https://storage.test/meals/u/m.jpg?expires=600");
    }

    /// Storage that always fails to delete, to exercise the cleanup logging paths.
    struct UndeletableStorage;

    #[async_trait]
    impl StorageClient for UndeletableStorage {
        async fn put_object(&self, _: &str, _: Bytes, _: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
            anyhow::bail!("bucket refused delete of {key}")
        }

        async fn presign_get(&self, key: &str, _: u64) -> anyhow::Result<String> {
            Ok(key.to_string())
        }
    }

    #[tokio::test]
    async fn failed_photo_cleanup_is_not_an_error() {
        let mut state = AppState::fake();
        state.storage = Arc::new(UndeletableStorage);
        discard_photo(&state, "meals/u/m.jpg").await;
    }

    /// Removes the meal row as soon as its photo lands, like a concurrent DELETE would.
    struct DeletesMealOnPut {
        inner: MemoryStorage,
        target: Mutex<Option<(PgPool, String, Uuid)>>,
    }

    #[async_trait]
    impl StorageClient for DeletesMealOnPut {
        async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
            self.inner.put_object(key, body, content_type).await?;
            let target = self.target.lock().unwrap().take();
            if let Some((db, user_id, meal_id)) = target {
                repo::delete(&db, &user_id, meal_id).await?;
            }
            Ok(())
        }

        async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
            self.inner.delete_object(key).await
        }

        async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String> {
            self.inner.presign_get(key, seconds).await
        }
    }

    fn test_user() -> String {
        format!("test-user-{}", Uuid::new_v4())
    }

    fn stored_keys(storage: &MemoryStorage) -> Vec<String> {
        let mut keys: Vec<String> = storage.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn meals_round_trip_through_the_database() {
        let storage = Arc::new(MemoryStorage::default());
        let Some(state) = AppState::with_test_database(storage.clone()).await else {
            return;
        };
        let user = test_user();
        let foods = vec![json!({"food": "rice", "grams": 150})];

        let first = create_meal(&state, &user, None, foods.clone(), json!({
            "totals": {"macronutrients": {"calories": 200}, "micronutrients": {}}
        }))
        .await
        .unwrap();
        assert_eq!(first.meal_name, "Custom Meal");
        assert_eq!(first.foods.0, foods);
        assert_eq!(first.totals.0.macro_value("calories"), Some(200.0));

        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = create_meal(&state, &user, Some("  Toast  ".into()), vec![], Value::Null)
            .await
            .unwrap();
        assert_eq!(second.meal_name, "Toast");
        assert_eq!(second.totals.0, NutrientTotals::default());

        let listed = repo::list_by_user(&state.db, &user, 20, 0).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        let page = repo::list_by_user(&state.db, &user, 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, first.id);

        let renamed = repo::rename(&state.db, &user, first.id, "Rice Bowl").await.unwrap().unwrap();
        assert_eq!(renamed.meal_name, "Rice Bowl");

        // scoped to the owner
        let stranger = test_user();
        assert!(repo::find(&state.db, &stranger, first.id).await.unwrap().is_none());
        assert!(repo::rename(&state.db, &stranger, first.id, "x").await.unwrap().is_none());
        assert!(!delete_meal(&state, &stranger, first.id).await.unwrap());

        assert!(delete_meal(&state, &user, first.id).await.unwrap());
        assert!(!delete_meal(&state, &user, first.id).await.unwrap());
        assert!(repo::find(&state.db, &user, first.id).await.unwrap().is_none());
        assert!(stored_keys(&storage).is_empty());
    }

    #[tokio::test]
    async fn replacing_a_photo_removes_the_previous_object() {
        let storage = Arc::new(MemoryStorage::default());
        let Some(state) = AppState::with_test_database(storage.clone()).await else {
            return;
        };
        let user = test_user();
        let meal = create_meal(&state, &user, Some("Salad".into()), vec![], Value::Null)
            .await
            .unwrap();

        let jpg = attach_photo(&state, &user, meal.id, Bytes::from_static(b"jpg"), "image/jpeg")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored_keys(&storage), vec![jpg.clone()]);

        let png = attach_photo(&state, &user, meal.id, Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap()
            .unwrap();
        assert!(png.ends_with(".png"));
        assert_eq!(stored_keys(&storage), vec![png.clone()]);
        let stored = repo::find(&state.db, &user, meal.id).await.unwrap().unwrap();
        assert_eq!(stored.photo_key.as_deref(), Some(png.as_str()));

        assert!(delete_meal(&state, &user, meal.id).await.unwrap());
        assert!(stored_keys(&storage).is_empty());
    }

    #[tokio::test]
    async fn photo_for_unknown_meal_is_not_stored() {
        let storage = Arc::new(MemoryStorage::default());
        let Some(state) = AppState::with_test_database(storage.clone()).await else {
            return;
        };
        let res = attach_photo(&state, &test_user(), Uuid::new_v4(), Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap();
        assert!(res.is_none());
        assert!(stored_keys(&storage).is_empty());
    }

    #[tokio::test]
    async fn photo_is_discarded_when_meal_is_deleted_mid_upload() {
        let storage = Arc::new(DeletesMealOnPut {
            inner: MemoryStorage::default(),
            target: Mutex::new(None),
        });
        let Some(state) = AppState::with_test_database(storage.clone()).await else {
            return;
        };
        let user = test_user();
        let meal = create_meal(&state, &user, None, vec![], Value::Null).await.unwrap();
        *storage.target.lock().unwrap() = Some((state.db.clone(), user.clone(), meal.id));

        let res = attach_photo(&state, &user, meal.id, Bytes::from_static(b"x"), "image/jpeg")
            .await
            .unwrap();
        assert!(res.is_none());
        assert!(stored_keys(&storage.inner).is_empty());
    }
}
