//! Identifier conventions for generated entities, properties and relations

use std::collections::HashSet;

/// PascalCase, singular entity name for a snake_case table name.
///
/// `film_actor` → `FilmActor`, `categories` → `Category`. Words keep their
/// own casing after the first letter.
pub fn entity_name(table: &str) -> String {
    let joined: String = words(table).map(upper_first).collect();
    singularize(&joined)
}

/// camelCase property name for a snake_case column name
pub fn property_name(column: &str) -> String {
    let mut name = String::with_capacity(column.len());
    for (i, word) in words(column).enumerate() {
        if i == 0 {
            name.push_str(&lower_first(word));
        } else {
            name.push_str(&upper_first(word));
        }
    }
    name
}

/// Naive English singular: `ies` → `y`, a trailing `s` is dropped unless it
/// follows another `s` or a `u`.
///
/// Irregular plurals are not handled, and a few singular words lose their
/// last letter (`alias` → `alia`, `series` → `sery`).
pub fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = name.strip_suffix('s') {
        if !stem.is_empty() && !stem.ends_with('s') && !stem.ends_with('u') {
            return stem.to_string();
        }
    }
    name.to_string()
}

/// Property name for a relation from `local_column` to `target_entity`,
/// distinct from every name in `used`.
///
/// Tried in order: the target entity name (`staff`), a name derived from
/// the local column (`manager_id` → `managerStaff`, `language_id` →
/// `language`), then the entity name with a counter (`staff2`, `staff3`).
/// A derived name equal to the bare entity name (a column named just `_id`
/// gives `Staff`) is skipped in favour of the counter.
pub fn relation_name(local_column: &str, target_entity: &str, used: &HashSet<String>) -> String {
    let base = lower_first(target_entity);
    if !used.contains(&base) {
        return base;
    }

    let stem = property_name(strip_id_suffix(local_column));
    let derived = if stem
        .to_lowercase()
        .contains(&target_entity.to_lowercase())
    {
        stem
    } else {
        format!("{stem}{target_entity}")
    };
    if !stem_is_blank(&derived, target_entity) && !used.contains(&derived) {
        return derived;
    }

    let mut counter = 2;
    loop {
        let candidate = format!("{base}{counter}");
        if !used.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

fn strip_id_suffix(column: &str) -> &str {
    if column.to_ascii_lowercase().ends_with("_id") {
        &column[..column.len() - 3]
    } else {
        column
    }
}

// A column named only `_id` derives the bare entity name, which is never new.
fn stem_is_blank(derived: &str, target_entity: &str) -> bool {
    derived.is_empty() || derived == target_entity
}

fn words(snake: &str) -> impl Iterator<Item = &str> {
    snake.split('_').filter(|word| !word.is_empty())
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn used(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn entity_names() {
        assert_eq!(entity_name("film_actor"), "FilmActor");
        assert_eq!(entity_name("actor"), "Actor");
        assert_eq!(entity_name("categories"), "Category");
        assert_eq!(entity_name("users"), "User");
        assert_eq!(entity_name("film_text"), "FilmText");
        assert_eq!(entity_name("staff"), "Staff");
        assert_eq!(entity_name("order__items"), "OrderItem");
        assert_eq!(entity_name("htmlPages"), "HtmlPage");
    }

    #[test]
    fn singularization_guards() {
        assert_eq!(singularize("Status"), "Status");
        assert_eq!(singularize("Address"), "Address");
        assert_eq!(singularize("Bus"), "Bus");
        assert_eq!(singularize("S"), "S");
    }

    #[test]
    fn known_singularization_misfires() {
        assert_eq!(entity_name("alias"), "Alia");
        assert_eq!(entity_name("series"), "Sery");
        assert_eq!(entity_name("people"), "People");
        assert_eq!(entity_name("statuses"), "Statuse");
    }

    #[test]
    fn property_names() {
        assert_eq!(property_name("first_name"), "firstName");
        assert_eq!(property_name("last_update"), "lastUpdate");
        assert_eq!(property_name("rating"), "rating");
        assert_eq!(property_name("Title"), "title");
        assert_eq!(property_name("_private__field"), "privateField");
    }

    #[test]
    fn relation_takes_entity_name_first() {
        assert_eq!(relation_name("language_id", "Language", &used(&[])), "language");
        assert_eq!(
            relation_name("actor_id", "FilmActor", &used(&["title"])),
            "filmActor"
        );
    }

    #[test]
    fn relation_derives_from_column_on_collision() {
        let taken = used(&["staff"]);
        assert_eq!(relation_name("manager_id", "Staff", &taken), "managerStaff");
        assert_eq!(
            relation_name("original_language_id", "Language", &used(&["language"])),
            "originalLanguage"
        );
    }

    #[test]
    fn relation_falls_back_to_counter() {
        assert_eq!(relation_name("staff", "Staff", &used(&["staff"])), "staff2");
        assert_eq!(
            relation_name("staff_id", "Staff", &used(&["staff", "staff2"])),
            "staff3"
        );
        assert_eq!(relation_name("_id", "Staff", &used(&["staff"])), "staff2");
    }
}
