use crate::model::*;

/// Keep the managers that speak the language, serve the rating tier and cover
/// every requested product.
///
/// Directory lookups may match on any single product, so this runs on every
/// candidate list regardless of where it came from.
pub fn filter_eligible(candidates: Vec<SalesManager>, request: &AvailabilityRequest) -> Vec<SalesManager> {
    candidates
        .into_iter()
        .filter(|m| is_eligible(m, request))
        .collect()
}

pub fn is_eligible(manager: &SalesManager, request: &AvailabilityRequest) -> bool {
    manager.languages.contains(&request.language)
        && manager.customer_ratings.contains(&request.rating)
        && request.products.iter().all(|p| manager.products.contains(p))
}
