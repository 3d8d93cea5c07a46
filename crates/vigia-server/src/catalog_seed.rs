use serde::Deserialize;
use vigia_common::status::CatalogKind;
use vigia_common::types::CatalogSeedItem;
use vigia_storage::{CatalogSync, Store};

/// Seed file accepted by `init-catalogs`: either a bare array of items or an
/// object with an `items` array.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogSeedFile {
    Wrapped { items: Vec<CatalogSeedItem> },
    Bare(Vec<CatalogSeedItem>),
}

impl CatalogSeedFile {
    fn into_items(self) -> Vec<CatalogSeedItem> {
        match self {
            CatalogSeedFile::Wrapped { items } | CatalogSeedFile::Bare(items) => items,
        }
    }
}

/// Build the built-in catalog entries. Parents always precede their children.
pub fn default_seed_items() -> Vec<CatalogSeedItem> {
    let mut items = Vec::new();
    let mut order: i32;

    // ---- regional offices ----
    order = 0;
    for (name, abbreviation) in [
        ("Oficina Regional Norte", "ORN"),
        ("Oficina Regional Centro", "ORC"),
        ("Oficina Regional Sur", "ORS"),
        ("Oficina Regional Sureste", "ORSE"),
        ("Oficina Regional Marina Noreste", "ORMNE"),
        ("Oficina Regional Marina Suroeste", "ORMSO"),
    ] {
        order += 1;
        items.push(make_item(
            CatalogKind::RegionalOffice,
            name,
            Some(abbreviation),
            None,
            None,
            order,
        ));
    }

    // ---- report types ----
    order = 0;
    for (name, abbreviation) in [
        ("Acción Preventiva", "AP"),
        ("Problemática Social", "PS"),
        ("Conflicto", "CON"),
        ("Contingencia", "CON"),
    ] {
        order += 1;
        items.push(make_item(
            CatalogKind::ReportType,
            name,
            Some(abbreviation),
            None,
            None,
            order,
        ));
    }

    // ---- federal entities, by regional office ----
    order = 0;
    for (name, abbreviation, office) in [
        ("Ciudad de México", "CDMX", "Oficina Regional Centro"),
        ("Estado de México", "EDOMEX", "Oficina Regional Centro"),
        ("Nuevo León", "NL", "Oficina Regional Norte"),
        ("Jalisco", "JAL", "Oficina Regional Centro"),
        ("Veracruz", "VER", "Oficina Regional Sureste"),
        ("Tabasco", "TAB", "Oficina Regional Sureste"),
        ("Campeche", "CAM", "Oficina Regional Sureste"),
        ("Chiapas", "CHIS", "Oficina Regional Sur"),
        ("Tamaulipas", "TAMS", "Oficina Regional Norte"),
        ("Coahuila", "COAH", "Oficina Regional Norte"),
    ] {
        order += 1;
        items.push(make_item(
            CatalogKind::FederalEntity,
            name,
            Some(abbreviation),
            Some(office),
            None,
            order,
        ));
    }

    // ---- municipalities, by federal entity ----
    order = 0;
    for (name, entity) in [
        ("Benito Juárez", "Ciudad de México"),
        ("Miguel Hidalgo", "Ciudad de México"),
        ("Cuauhtémoc", "Ciudad de México"),
        ("Naucalpan", "Estado de México"),
        ("Tlalnepantla", "Estado de México"),
        ("Monterrey", "Nuevo León"),
        ("San Nicolás", "Nuevo León"),
        ("Guadalajara", "Jalisco"),
        ("Zapopan", "Jalisco"),
        ("Veracruz", "Veracruz"),
    ] {
        order += 1;
        items.push(make_item(
            CatalogKind::Municipality,
            name,
            None,
            Some(entity),
            None,
            order,
        ));
    }

    for (kind, names) in [
        (
            CatalogKind::AttentionType,
            &[
                "Mesa de diálogo",
                "Reunión de trabajo",
                "Visita de campo",
                "Gestión ante autoridades",
                "Capacitación",
                "Entrega de apoyos",
                "Firma de convenio",
                "Otro",
            ][..],
        ),
        (
            CatalogKind::InternalActor,
            &[
                "Dirección General",
                "Subdirección de Desarrollo Social",
                "Subdirección de Producción",
                "Subdirección de Exploración",
                "Subdirección de Perforación",
                "Coordinación de Relaciones Institucionales",
                "Gerencia Regional",
                "Coordinación de Seguridad Física",
                "Otro",
            ][..],
        ),
        (
            CatalogKind::IssueType,
            &[
                "Laboral",
                "Ambiental",
                "Territorial",
                "Servicios públicos",
                "Desarrollo social",
                "Seguridad",
                "Económica",
                "Política",
                "Otro",
            ][..],
        ),
        (
            CatalogKind::ClassificationGrade,
            &["Bajo", "Medio", "Alto", "Crítico"][..],
        ),
    ] {
        for (i, name) in names.iter().enumerate() {
            items.push(make_item(kind, name, None, None, None, (i + 1) as i32));
        }
    }

    // ---- general statuses, grouped ----
    for (group, names) in [
        (
            "report",
            &["En proceso", "Atendido", "Cerrado", "Suspendido"][..],
        ),
        (
            "compliance",
            &["Sin iniciar", "En proceso", "Cumplido", "Incumplido"][..],
        ),
        (
            "probability",
            &[
                "25% En Atención",
                "50% Autorizado",
                "75% En Ejecución",
                "100% Concluido",
            ][..],
        ),
    ] {
        for (i, name) in names.iter().enumerate() {
            items.push(make_item(
                CatalogKind::GeneralStatus,
                name,
                None,
                None,
                Some(group),
                (i + 1) as i32,
            ));
        }
    }

    items
}

fn make_item(
    kind: CatalogKind,
    name: &str,
    abbreviation: Option<&str>,
    parent: Option<&str>,
    group_key: Option<&str>,
    sort_order: i32,
) -> CatalogSeedItem {
    CatalogSeedItem {
        kind,
        name: name.to_string(),
        abbreviation: abbreviation.map(|a| a.to_string()),
        parent: parent.map(|p| p.to_string()),
        group_key: group_key.map(|g| g.to_string()),
        sort_order: Some(sort_order),
    }
}

/// Sync the built-in catalogs on every startup. Existing entries are
/// refreshed, entries added since the last run are inserted.
pub async fn init_default_catalogs(store: &Store) -> anyhow::Result<CatalogSync> {
    let items = default_seed_items();
    let outcome = store.sync_catalog(&items, true).await?;
    tracing::info!(
        inserted = outcome.inserted,
        updated = outcome.updated,
        skipped = outcome.skipped,
        "Default catalogs synced"
    );
    Ok(outcome)
}

/// Import catalog entries from a JSON seed file. Entries that already exist
/// are left as they are.
pub async fn init_from_seed_file(store: &Store, seed_path: &str) -> anyhow::Result<CatalogSync> {
    let content = std::fs::read_to_string(seed_path)
        .map_err(|e| anyhow::anyhow!("Failed to read seed file '{}': {}", seed_path, e))?;
    let seed: CatalogSeedFile = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse seed file '{}': {}", seed_path, e))?;
    let items = seed.into_items();

    let outcome = store.sync_catalog(&items, false).await?;
    tracing::info!(
        path = %seed_path,
        total = items.len(),
        inserted = outcome.inserted,
        updated = outcome.updated,
        skipped = outcome.skipped,
        "init-catalogs completed"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parents_precede_children() {
        let items = default_seed_items();
        for (i, item) in items.iter().enumerate() {
            let (Some(parent), Some(parent_kind)) = (&item.parent, item.kind.parent_kind()) else {
                continue;
            };
            let found = items[..i]
                .iter()
                .any(|p| p.kind == parent_kind && &p.name == parent);
            assert!(found, "{} '{}' precedes its parent", item.kind, item.name);
        }
    }

    #[test]
    fn report_types_map_to_folio_kinds() {
        for item in default_seed_items()
            .iter()
            .filter(|i| i.kind == CatalogKind::ReportType)
        {
            assert!(
                vigia_common::status::ReportKind::from_type_name(&item.name).is_some(),
                "{} has no folio kind",
                item.name
            );
        }
    }

    #[test]
    fn compliance_group_has_follow_up_statuses() {
        let names: Vec<String> = default_seed_items()
            .into_iter()
            .filter(|i| i.group_key.as_deref() == Some("compliance"))
            .map(|i| i.name)
            .collect();
        assert!(names.contains(&"Cumplido".to_string()));
        assert!(names.contains(&"En proceso".to_string()));
    }

    #[test]
    fn seed_file_accepts_both_shapes() {
        let bare = r#"[{"kind":"issue_type","name":"Agua"}]"#;
        let wrapped = r#"{"items":[{"kind":"issue_type","name":"Agua"}]}"#;
        for raw in [bare, wrapped] {
            let items = serde_json::from_str::<CatalogSeedFile>(raw)
                .expect("seed should parse")
                .into_items();
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].kind, CatalogKind::IssueType);
        }
    }
}
