use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use super::store::ConsentCategory;

/// Banner copy for one cookie category.
#[derive(Debug, Clone, Serialize)]
pub struct CookieCategoryDescription {
    pub category: ConsentCategory,
    pub title: &'static str,
    pub description: &'static str,
    pub examples: &'static [&'static str],
    pub required: bool,
}

pub fn cookie_categories() -> Vec<CookieCategoryDescription> {
    ConsentCategory::ALL.iter().copied().map(describe).collect()
}

pub fn describe(category: ConsentCategory) -> CookieCategoryDescription {
    match category {
        ConsentCategory::Necessary => CookieCategoryDescription {
            category,
            title: "Cookies Techniques (Obligatoires)",
            description: "Ces cookies sont nécessaires au fonctionnement du site web. Ils ne peuvent pas être désactivés.",
            examples: &["Session utilisateur", "Sécurité", "Préférences de base"],
            required: true,
        },
        ConsentCategory::Analytics => CookieCategoryDescription {
            category,
            title: "Cookies Analytiques (Optionnels)",
            description: "Ces cookies nous aident à comprendre comment les visiteurs interagissent avec notre site web.",
            examples: &["Google Analytics", "Statistiques de visite", "Pages les plus consultées"],
            required: false,
        },
        ConsentCategory::Marketing => CookieCategoryDescription {
            category,
            title: "Cookies Marketing (Optionnels)",
            description: "Ces cookies sont utilisés pour afficher des publicités pertinentes et mesurer leur efficacité.",
            examples: &["Publicité ciblée", "Réseaux sociaux", "Campagnes marketing"],
            required: false,
        },
        ConsentCategory::Preferences => CookieCategoryDescription {
            category,
            title: "Cookies de Préférences (Optionnels)",
            description: "Ces cookies permettent au site de se souvenir de vos choix et préférences.",
            examples: &["Langue préférée", "Thème sombre/clair", "Paramètres d'affichage"],
            required: false,
        },
    }
}

pub fn consent_router() -> Router {
    Router::new().route("/api/consent/categories", get(categories_handler))
}

pub(crate) async fn categories_handler() -> Json<Vec<CookieCategoryDescription>> {
    Json(cookie_categories())
}
