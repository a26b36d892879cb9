use crate::models::Story;

/// Stories whose title contains `term`, ignoring case, in their original order.
pub fn search_stories<'a>(stories: &'a [Story], term: &str) -> Vec<&'a Story> {
    let term = term.to_lowercase();
    stories
        .iter()
        .filter(|story| story.title.to_lowercase().contains(&term))
        .collect()
}
