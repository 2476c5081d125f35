use crate::console::Console;
use crate::error::{Result, VclError};
use crate::model::MethodEntry;

/// Picks the transport to use. A single method is taken as-is; several are
/// offered through the console with a 1-based prompt.
pub fn choose_method<'m>(
    methods: &'m [MethodEntry],
    console: &dyn Console,
) -> Result<&'m MethodEntry> {
    match methods {
        [] => Err(VclError::NoConnectionMethods),
        [only] => Ok(only),
        _ => {
            console.info("Available connection methods:");
            for (idx, method) in methods.iter().enumerate() {
                console.info(&format!("  {}. {}", idx + 1, method.description));
            }
            let selection = console.prompt_int("Enter a number")?;
            pick(methods, selection)
        }
    }
}

/// 1-based lookup shared by every numbered prompt.
pub fn pick<T>(items: &[T], selection: i64) -> Result<&T> {
    usize::try_from(selection)
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| items.get(idx))
        .ok_or(VclError::InvalidSelection {
            selection,
            count: items.len(),
        })
}
