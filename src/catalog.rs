use crate::console::Console;
use crate::error::{Result, VclError};
use crate::model::Image;

/// Case-insensitive substring match on image names.
pub fn filter_images(images: &[Image], term: &str) -> Result<Vec<Image>> {
    let needle = term.to_lowercase();
    let matches: Vec<Image> = images
        .iter()
        .filter(|image| image.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    if matches.is_empty() {
        return Err(VclError::NoMatchingImages(term.to_string()));
    }
    Ok(matches)
}

pub fn is_image_id(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Resolves an image argument that is either an id or part of a name.
/// `show_matches` renders the candidates when more than one name matches.
pub fn resolve_image(
    image: &str,
    images: &[Image],
    console: &dyn Console,
    show_matches: impl FnOnce(&[Image]),
) -> Result<String> {
    if is_image_id(image) {
        return Ok(image.to_string());
    }

    let matches = filter_images(images, image)?;
    if let [only] = matches.as_slice() {
        return Ok(only.id.clone());
    }

    show_matches(&matches);
    let id = console.prompt_int("Multiple matches found. Please enter image ID")?;
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::tests::ScriptedConsole;

    fn catalog() -> Vec<Image> {
        vec![
            Image {
                id: "7".to_string(),
                name: "Ubuntu 22.04 LTS".to_string(),
            },
            Image {
                id: "8".to_string(),
                name: "Ubuntu 24.04 LTS".to_string(),
            },
            Image {
                id: "9".to_string(),
                name: "Windows 11".to_string(),
            },
        ]
    }

    #[test]
    fn image_ids_are_non_empty_digits() {
        assert!(is_image_id("7"));
        assert!(!is_image_id(""));
        assert!(!is_image_id("7a"));
    }

    #[test]
    fn empty_argument_is_treated_as_a_name() {
        let console = ScriptedConsole::default();
        let err = resolve_image("", &[], &console, |_| {}).unwrap_err();
        assert!(matches!(err, VclError::NoMatchingImages(ref term) if term.is_empty()));
    }

    #[test]
    fn numeric_argument_is_used_as_id() {
        let console = ScriptedConsole::default();
        let id = resolve_image("7", &[], &console, |_| panic!("no listing expected")).unwrap();
        assert_eq!(id, "7");
    }

    #[test]
    fn single_name_match_resolves_without_prompt() {
        let console = ScriptedConsole::default();
        let id =
            resolve_image("windows", &catalog(), &console, |_| panic!("no listing expected"))
                .unwrap();
        assert_eq!(id, "9");
        assert_eq!(console.prompts(), 0);
    }

    #[test]
    fn several_matches_are_listed_then_prompted() {
        let console = ScriptedConsole::answering(&[8], &[]);
        let mut shown = Vec::new();

        let id = resolve_image("ubuntu", &catalog(), &console, |m| shown = m.to_vec()).unwrap();

        assert_eq!(id, "8");
        assert_eq!(shown.len(), 2);
    }

    #[test]
    fn no_match_is_an_error() {
        let console = ScriptedConsole::default();
        let err = resolve_image("fedora", &catalog(), &console, |_| {}).unwrap_err();
        assert_eq!(err.to_string(), "No matches found for 'fedora'.");
    }
}
