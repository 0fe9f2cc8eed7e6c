//! `rot item` commands: roadmap item CRUD and bulk delete.

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use super::roadmap::{RoadmapQuery, view_instant};
use super::{Context, Output, exists, non_empty, to_json_string, unique_id};
use crate::models::{RoadmapItem, Role, normalize_tag};
use crate::roadmap::{Selection, SelectionState, compare_items, item_span};
use crate::storage::{
    ITEM_PREFIX, OBJECTIVE_PREFIX, Storage, parse_date, parse_item_status, validate_id,
};
use crate::{Error, Result};

/// Item fields given on the command line. `None` leaves a field untouched;
/// an empty string clears an optional text field.
#[derive(Debug, Clone, Default)]
pub struct ItemFields {
    pub name: Option<String>,
    pub status: Option<String>,
    pub start: Option<String>,
    pub months: Option<i64>,
    pub metric: Option<String>,
    pub thesis: Option<String>,
    pub product: Option<String>,
    pub sub_product: Option<String>,
    pub objective: Option<String>,
}

impl ItemFields {
    /// Apply the given fields to `item`, returning the names of those changed.
    fn apply(self, item: &mut RoadmapItem, storage: &Storage) -> Result<Vec<&'static str>> {
        let mut changed = Vec::new();

        if let Some(name) = self.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(Error::InvalidInput("Item name cannot be empty".to_string()));
            }
            item.name = name;
            changed.push("name");
        }
        if let Some(status) = self.status {
            item.status = parse_item_status(&status)?;
            changed.push("status");
        }
        if let Some(start) = self.start {
            item.start_date = Some(parse_date(&start)?);
            changed.push("start_date");
        }
        if let Some(months) = self.months {
            if months < 1 {
                return Err(Error::InvalidInput(format!(
                    "Duration must be at least 1 month, got {}",
                    months
                )));
            }
            item.duration_months = Some(months);
            changed.push("duration_months");
        }
        if let Some(metric) = self.metric {
            item.metric = non_empty(Some(metric));
            changed.push("metric");
        }
        if let Some(thesis) = self.thesis {
            item.thesis = non_empty(Some(thesis));
            changed.push("thesis");
        }
        if let Some(product) = self.product {
            item.product = normalize_tag(Some(&product));
            changed.push("product");
        }
        if let Some(sub_product) = self.sub_product {
            item.sub_product = normalize_tag(Some(&sub_product));
            changed.push("sub_product");
        }
        if let Some(objective) = self.objective {
            item.objective_id = match non_empty(Some(objective)) {
                Some(id) => {
                    validate_id(&id, OBJECTIVE_PREFIX)?;
                    storage.get_objective(&id)?;
                    Some(id)
                }
                None => None,
            };
            changed.push("objective_id");
        }

        Ok(changed)
    }
}

#[derive(Serialize)]
pub struct ItemCreated {
    pub id: String,
    pub name: String,
}

impl Output for ItemCreated {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Created item {} \"{}\"", self.id, self.name)
    }
}

/// Create a roadmap item. Requires editor.
///
/// A start date without a duration gets the configured default duration;
/// a missing product gets the configured default product.
pub fn item_create(ctx: &Context, fields: ItemFields) -> Result<ItemCreated> {
    let mut storage = ctx.open_storage()?;
    ctx.require_role(&storage, Role::Editor)?;
    let config = ctx.config(&storage)?;

    let seed = fields.name.clone().unwrap_or_default();
    if seed.trim().is_empty() {
        return Err(Error::InvalidInput("Item name is required".to_string()));
    }
    let id = unique_id(ITEM_PREFIX, &seed, |id| exists(storage.get_item(id)))?;
    let mut item = RoadmapItem::new(id, String::new());
    fields.apply(&mut item, &storage)?;

    if item.start_date.is_some() && item.duration_months.is_none() {
        item.duration_months = Some(i64::from(config.default_duration_months.value));
    }
    if item.product.is_none() {
        item.product = config.default_product.map(|p| p.value);
    }

    storage.create_item(&item)?;
    Ok(ItemCreated {
        id: item.id,
        name: item.name,
    })
}

#[derive(Serialize)]
pub struct ItemList {
    pub items: Vec<RoadmapItem>,
    pub count: usize,
}

impl Output for ItemList {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.items.is_empty() {
            return "No items.".to_string();
        }
        let mut lines = vec![format!("{} item(s):", self.count)];
        for item in &self.items {
            let schedule = match (item.start_date, item.months_included()) {
                (Some(start), Some(months)) => format!("{} +{}mo", start.format("%Y-%m"), months),
                _ => "undated".to_string(),
            };
            lines.push(format!(
                "  {} {:<14} {:<12} {}",
                item.id,
                item.status.as_str(),
                schedule,
                item.name
            ));
        }
        lines.join("\n")
    }
}

/// List items in display order, optionally filtered by product and status.
pub fn item_list(ctx: &Context, product: Option<&str>, status: Option<&str>) -> Result<ItemList> {
    let storage = ctx.open_storage()?;
    let product = normalize_tag(product);
    let status = status.map(parse_item_status).transpose()?;

    let mut items: Vec<RoadmapItem> = storage
        .list_items()?
        .into_iter()
        .filter(|item| product.is_none() || item.product == product)
        .filter(|item| status.as_ref().is_none_or(|s| &item.status == s))
        .collect();
    items.sort_by(compare_items);

    Ok(ItemList {
        count: items.len(),
        items,
    })
}

#[derive(Serialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: RoadmapItem,
    /// First and last day covered, for dated items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<(NaiveDate, NaiveDate)>,
}

impl Output for ItemDetail {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let item = &self.item;
        let mut lines = vec![
            format!("{} {}", item.id, item.name),
            format!("  Status: {}", item.status),
        ];
        match self.span {
            Some((first, last)) => lines.push(format!(
                "  Schedule: {} to {} ({} month(s))",
                first,
                last,
                item.months_included().unwrap_or(1)
            )),
            None => lines.push("  Schedule: undated".to_string()),
        }
        if let Some(product) = &item.product {
            match &item.sub_product {
                Some(sub) => lines.push(format!("  Product: {}/{}", product, sub)),
                None => lines.push(format!("  Product: {}", product)),
            }
        }
        if let Some(metric) = &item.metric {
            lines.push(format!("  Metric: {}", metric));
        }
        if let Some(thesis) = &item.thesis {
            lines.push(format!("  Thesis: {}", thesis));
        }
        if let Some(objective) = &item.objective_id {
            lines.push(format!("  Objective: {}", objective));
        }
        lines.join("\n")
    }
}

pub fn item_show(ctx: &Context, id: &str) -> Result<ItemDetail> {
    validate_id(id, ITEM_PREFIX)?;
    let storage = ctx.open_storage()?;
    let item = storage.get_item(id)?;
    Ok(ItemDetail {
        span: item_span(&item),
        item,
    })
}

#[derive(Serialize)]
pub struct ItemUpdated {
    pub id: String,
    pub updated_fields: Vec<&'static str>,
}

impl Output for ItemUpdated {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.updated_fields.is_empty() {
            format!("No changes to {}", self.id)
        } else {
            format!("Updated {}: {}", self.id, self.updated_fields.join(", "))
        }
    }
}

/// Update an item. `undated` clears the start date and duration first.
/// A start date left without a duration gets the configured default, as on
/// create. Requires editor.
pub fn item_update(ctx: &Context, id: &str, fields: ItemFields, undated: bool) -> Result<ItemUpdated> {
    validate_id(id, ITEM_PREFIX)?;
    let mut storage = ctx.open_storage()?;
    ctx.require_role(&storage, Role::Editor)?;

    let mut item = storage.get_item(id)?;
    let mut updated_fields = Vec::new();
    if undated {
        item.start_date = None;
        item.duration_months = None;
        updated_fields.extend(["start_date", "duration_months"]);
    }
    for field in fields.apply(&mut item, &storage)? {
        if !updated_fields.contains(&field) {
            updated_fields.push(field);
        }
    }
    if item.start_date.is_some() && item.duration_months.is_none() {
        let months = ctx.config(&storage)?.default_duration_months.value;
        item.duration_months = Some(i64::from(months));
        if !updated_fields.contains(&"duration_months") {
            updated_fields.push("duration_months");
        }
    }

    if !updated_fields.is_empty() {
        item.updated_at = Utc::now();
        storage.update_item(&item)?;
    }
    Ok(ItemUpdated {
        id: item.id,
        updated_fields,
    })
}

#[derive(Serialize)]
pub struct ItemDeleted {
    pub id: String,
}

impl Output for ItemDeleted {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted {}", self.id)
    }
}

pub fn item_delete(ctx: &Context, id: &str) -> Result<ItemDeleted> {
    validate_id(id, ITEM_PREFIX)?;
    let mut storage = ctx.open_storage()?;
    ctx.require_role(&storage, Role::Editor)?;
    storage.delete_item(id)?;
    Ok(ItemDeleted { id: id.to_string() })
}

#[derive(Serialize)]
pub struct BulkDeleteResult {
    /// Selection state against the visible set, when `--visible` was used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionState>,
    pub requested: usize,
    pub deleted: usize,
    pub ids: Vec<String>,
}

impl Output for BulkDeleteResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Deleted {} of {} selected item(s)", self.deleted, self.requested);
        if !self.ids.is_empty() {
            out.push_str(&format!(": {}", self.ids.join(", ")));
        }
        out
    }
}

/// Delete a selection of items in one transaction. Requires editor.
///
/// With `visible`, every item the roadmap query shows is selected first
/// (the header checkbox); each explicit id is then toggled, so an id that is
/// already selected is excluded again.
pub fn item_bulk_delete(
    ctx: &Context,
    ids: &[String],
    visible: bool,
    query: &RoadmapQuery,
    at: Option<NaiveDate>,
) -> Result<BulkDeleteResult> {
    for id in ids {
        validate_id(id, ITEM_PREFIX)?;
    }
    let mut storage = ctx.open_storage()?;
    ctx.require_role(&storage, Role::Editor)?;

    let mut selection = Selection::new();
    let mut state = None;
    if visible {
        let items = storage.list_items()?;
        let visible_ids = query.visible_ids(&items, view_instant(at).date());
        selection.toggle_all(visible_ids.iter());
        for id in ids {
            selection.toggle(id);
        }
        state = Some(selection.state(visible_ids.iter()));
    } else {
        for id in ids {
            if !selection.is_selected(id) {
                selection.toggle(id);
            }
        }
    }

    if selection.is_empty() {
        return Err(Error::InvalidInput(
            "Nothing selected (pass --id or --visible)".to_string(),
        ));
    }

    let batch = selection.snapshot();
    let deleted = storage.delete_items(&batch)?;
    tracing::info!(requested = batch.len(), deleted, "bulk delete");
    Ok(BulkDeleteResult {
        selection: state,
        requested: batch.len(),
        deleted,
        ids: batch.ids().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{system_init, user_add};
    use crate::models::ItemStatus;
    use crate::roadmap::Quarter;
    use crate::test_utils::TestEnv;

    fn fields(name: &str) -> ItemFields {
        ItemFields {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn setup() -> (TestEnv, Context) {
        let env = TestEnv::new();
        let ctx = env.context(None);
        system_init(&ctx, None).unwrap();
        (env, ctx)
    }

    #[test]
    fn test_create_and_show() {
        let (_env, ctx) = setup();
        let created = item_create(
            &ctx,
            ItemFields {
                start: Some("2024-06-15".to_string()),
                months: Some(2),
                product: Some("Web".to_string()),
                sub_product: Some("  ".to_string()),
                status: Some("current sprint".to_string()),
                ..fields("Checkout")
            },
        )
        .unwrap();
        assert!(created.id.starts_with("rm-"));

        let detail = item_show(&ctx, &created.id).unwrap();
        assert_eq!(detail.item.status, ItemStatus::CurrentSprint);
        assert_eq!(detail.item.product.as_deref(), Some("web"));
        assert_eq!(detail.item.sub_product, None);
        assert_eq!(
            detail.span,
            Some((
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 7, 31).unwrap()
            ))
        );
    }

    #[test]
    fn test_create_uses_configured_defaults() {
        let (env, ctx) = setup();
        let storage = env.open_storage();
        let mut config = crate::config::load_config(&storage).unwrap();
        config.set("default-duration-months", "3").unwrap();
        config.set("default-product", "app").unwrap();
        crate::config::save_config(&storage, &config).unwrap();

        let created = item_create(
            &ctx,
            ItemFields {
                start: Some("2024-01-01".to_string()),
                ..fields("Onboarding")
            },
        )
        .unwrap();
        let item = item_show(&ctx, &created.id).unwrap().item;
        assert_eq!(item.duration_months, Some(3));
        assert_eq!(item.product.as_deref(), Some("app"));

        let undated = item_create(&ctx, fields("Someday")).unwrap();
        assert_eq!(item_show(&ctx, &undated.id).unwrap().item.duration_months, None);
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let (_env, ctx) = setup();
        assert!(matches!(item_create(&ctx, fields("  ")), Err(Error::InvalidInput(_))));
        assert!(item_create(&ctx, ItemFields { status: Some("paused".into()), ..fields("A") }).is_err());
        assert!(item_create(&ctx, ItemFields { start: Some("2024-13-01".into()), ..fields("A") }).is_err());
        assert!(item_create(&ctx, ItemFields { months: Some(0), ..fields("A") }).is_err());
        assert!(matches!(
            item_create(&ctx, ItemFields { objective: Some("okr-ffff".into()), ..fields("A") }),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_update_and_clear_schedule() {
        let (_env, ctx) = setup();
        let id = item_create(
            &ctx,
            ItemFields {
                start: Some("2024-01-01".to_string()),
                months: Some(1),
                metric: Some("NPS".to_string()),
                ..fields("Item")
            },
        )
        .unwrap()
        .id;

        let updated = item_update(
            &ctx,
            &id,
            ItemFields {
                status: Some("done".to_string()),
                metric: Some(String::new()),
                ..Default::default()
            },
            false,
        )
        .unwrap();
        assert_eq!(updated.updated_fields, vec!["status", "metric"]);
        let item = item_show(&ctx, &id).unwrap().item;
        assert_eq!(item.status, ItemStatus::Done);
        assert_eq!(item.metric, None);

        item_update(&ctx, &id, ItemFields::default(), true).unwrap();
        assert!(item_show(&ctx, &id).unwrap().item.is_undated());

        let none = item_update(&ctx, &id, ItemFields::default(), false).unwrap();
        assert!(none.updated_fields.is_empty());
    }

    #[test]
    fn test_update_start_on_undated_item_uses_default_duration() {
        let (_env, ctx) = setup();
        crate::commands::config_set(&ctx, "default-duration-months", "2").unwrap();
        let id = item_create(&ctx, fields("Later")).unwrap().id;

        let updated = item_update(
            &ctx,
            &id,
            ItemFields {
                start: Some("2024-07-01".to_string()),
                ..Default::default()
            },
            false,
        )
        .unwrap();
        assert_eq!(updated.updated_fields, vec!["start_date", "duration_months"]);

        let item = item_show(&ctx, &id).unwrap().item;
        assert_eq!(item.duration_months, Some(2));
        assert!(!item.is_undated());
        assert!(crate::roadmap::calendar::is_visible_in_quarter(&item, Quarter::Q3, 2024));
        assert!(!crate::roadmap::calendar::is_visible_in_quarter(&item, Quarter::Q1, 2024));
    }

    #[test]
    fn test_list_in_display_order() {
        let (_env, ctx) = setup();
        item_create(&ctx, ItemFields { status: Some("not_started".into()), ..fields("B") }).unwrap();
        item_create(&ctx, ItemFields { status: Some("done".into()), ..fields("A") }).unwrap();

        let list = item_list(&ctx, None, None).unwrap();
        let names: Vec<&str> = list.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);

        let done = item_list(&ctx, None, Some("done")).unwrap();
        assert_eq!(done.count, 1);
    }

    #[test]
    fn test_viewer_cannot_edit() {
        let env = TestEnv::new();
        system_init(&env.context(None), Some("admin@example.com")).unwrap();
        user_add(&env.context(Some("admin@example.com")), "v@example.com", None, "viewer").unwrap();

        let viewer = env.context(Some("v@example.com"));
        assert!(matches!(
            item_create(&viewer, fields("X")),
            Err(Error::PermissionDenied { .. })
        ));
        assert!(item_list(&viewer, None, None).is_ok());
    }

    #[test]
    fn test_delete_missing_item() {
        let (_env, ctx) = setup();
        assert!(matches!(item_delete(&ctx, "rm-0000"), Err(Error::NotFound(_))));
        assert!(matches!(item_delete(&ctx, "bogus"), Err(Error::InvalidId(_))));
    }

    #[test]
    fn test_bulk_delete_visible_with_exclusion() {
        let (_env, ctx) = setup();
        let dated = |name: &str, start: &str| ItemFields {
            start: Some(start.to_string()),
            months: Some(1),
            ..fields(name)
        };
        let a = item_create(&ctx, dated("A", "2024-07-01")).unwrap().id;
        let b = item_create(&ctx, dated("B", "2024-08-01")).unwrap().id;
        let c = item_create(&ctx, dated("C", "2025-01-01")).unwrap().id;

        let query = RoadmapQuery {
            quarter: Some(Quarter::Q3),
            year: Some(2024),
            ..Default::default()
        };
        let result = item_bulk_delete(&ctx, &[b.clone()], true, &query, None).unwrap();
        assert_eq!(result.selection, Some(SelectionState::PartiallySelected));
        assert_eq!(result.ids, vec![a.clone()]);
        assert_eq!(result.deleted, 1);

        let remaining: Vec<String> = item_list(&ctx, None, None)
            .unwrap()
            .items
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert!(remaining.contains(&b) && remaining.contains(&c));
        assert!(!remaining.contains(&a));
    }

    #[test]
    fn test_bulk_delete_explicit_ids() {
        let (_env, ctx) = setup();
        let a = item_create(&ctx, fields("A")).unwrap().id;
        let result = item_bulk_delete(
            &ctx,
            &[a.clone(), a.clone(), "rm-0000".to_string()],
            false,
            &RoadmapQuery::default(),
            None,
        )
        .unwrap();
        assert_eq!(result.requested, 2);
        assert_eq!(result.deleted, 1);
        assert!(result.selection.is_none());

        assert!(matches!(
            item_bulk_delete(&ctx, &[], false, &RoadmapQuery::default(), None),
            Err(Error::InvalidInput(_))
        ));
    }
}
