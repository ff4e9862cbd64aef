//! Party-planning tools backed by small fixed tables:
//! `suggest_menu`, `catering_service_tool` and
//! `superhero_party_theme_generator`.

use crate::tools::{handler, single_string_schema, str_arg, ToolMeta, ToolRegistry};

const MENUS: &[(&str, &str)] = &[
    ("casual", "Pizza, snacks, and soft drinks."),
    ("formal", "3-course dinner with wine selection."),
    ("superhero", "High-protein buffet and energy drinks."),
    ("custom", "Chef's choice custom menu."),
];

const CATERERS: &[(&str, f32)] = &[
    ("Gotham Catering Co.", 4.9),
    ("Wayne Manor Catering", 4.8),
    ("Gotham City Events", 4.7),
];

const THEMES: &[(&str, &str)] = &[
    ("classic heroes", "Justice League Gala."),
    ("villain masquerade", "Gotham Rogues' Ball."),
    ("futuristic gotham", "Neo-Gotham Cyberpunk Night."),
];

fn lookup<'a>(table: &'a [(&str, &'a str)], key: &str) -> Option<&'a str> {
    let key = key.trim().to_lowercase();
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

pub fn suggest_menu(occasion: &str) -> String {
    lookup(MENUS, occasion)
        .unwrap_or("Standard catering menu.")
        .to_string()
}

pub fn best_catering_service(query: &str) -> String {
    let (name, rating) = CATERERS
        .iter()
        .copied()
        .fold(("", f32::MIN), |best, c| if c.1 > best.1 { c } else { best });
    format!("Top result for '{query}': {name} (Rating: {rating:.1}/5.0)")
}

pub fn party_theme(category: &str) -> String {
    lookup(THEMES, category)
        .unwrap_or("Standard Superhero Theme.")
        .to_string()
}

pub fn register(registry: &mut ToolRegistry) {
    registry.register(
        ToolMeta {
            name: "suggest_menu".into(),
            description: "Suggests a menu based on the specified occasion.".into(),
            args_schema: single_string_schema(
                "occasion",
                "The type of occasion ('casual', 'formal', 'superhero', 'custom').",
            ),
        },
        handler(|args| async move {
            Ok::<_, anyhow::Error>(suggest_menu(str_arg(&args, "occasion")?))
        }),
    );
    registry.register(
        ToolMeta {
            name: "catering_service_tool".into(),
            description: "Returns the highest-rated catering service in the database.".into(),
            args_schema: single_string_schema("query", "Search term for catering services."),
        },
        handler(|args| async move {
            Ok::<_, anyhow::Error>(best_catering_service(str_arg(&args, "query")?))
        }),
    );
    registry.register(
        ToolMeta {
            name: "superhero_party_theme_generator".into(),
            description: "Generates creative superhero-themed party concepts based on a category."
                .into(),
            args_schema: single_string_schema(
                "category",
                "The category ('classic heroes', 'villain masquerade', 'futuristic gotham').",
            ),
        },
        handler(|args| async move {
            Ok::<_, anyhow::Error>(party_theme(str_arg(&args, "category")?))
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menus() {
        assert_eq!(suggest_menu("formal"), "3-course dinner with wine selection.");
        assert_eq!(suggest_menu(" Superhero "), "High-protein buffet and energy drinks.");
        assert_eq!(suggest_menu("picnic"), "Standard catering menu.");
    }

    #[test]
    fn catering_picks_highest_rating() {
        assert_eq!(
            best_catering_service("gala"),
            "Top result for 'gala': Gotham Catering Co. (Rating: 4.9/5.0)"
        );
    }

    #[test]
    fn themes_are_case_insensitive() {
        assert_eq!(party_theme("Villain Masquerade"), "Gotham Rogues' Ball.");
        assert_eq!(party_theme("space"), "Standard Superhero Theme.");
    }
}
