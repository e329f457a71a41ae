//! Name and path derivation.

/// Engine-convention prefixes stripped from native names.
pub const NAME_PREFIXES: [char; 6] = ['A', 'U', 'F', 'E', 'I', 'S'];

/// Display name of a native name: the engine-convention prefix letter is stripped when it is
/// followed by an upper-case letter.
///
/// ```rust
/// use bindweaver::model::names::display_name;
///
/// assert_eq!(display_name("AMyActor"), "MyActor");
/// assert_eq!(display_name("FVector"), "Vector");
/// assert_eq!(display_name("Actor"), "Actor");
/// ```
#[must_use]
pub fn display_name(native_name: &str) -> String {
    let base = native_name.split('`').next().unwrap_or(native_name);
    let mut chars = base.chars();
    match (chars.next(), chars.next()) {
        (Some(prefix), Some(next)) if NAME_PREFIXES.contains(&prefix) && next.is_ascii_uppercase() => {
            base[prefix.len_utf8()..].to_string()
        }
        _ => base.to_string(),
    }
}

/// Dotted native path of a type in `project`, e.g. `/Script/Game.MyActor`.
#[must_use]
pub fn native_path(project: &str, display_name: &str) -> String {
    format!("/Script/{project}.{display_name}")
}

/// Native path of a function or delegate signature owned by the type at `owner_path`.
#[must_use]
pub fn member_path(owner_path: &str, member: &str) -> String {
    format!("{owner_path}:{member}")
}

/// Package path of `namespace` relative to the project's root namespace, `/` separated.
///
/// ```rust
/// use bindweaver::model::names::package_path;
///
/// assert_eq!(package_path("Game", "Game.Actors.Weapons"), "Actors/Weapons");
/// assert_eq!(package_path("Game", "Game"), "");
/// assert_eq!(package_path("Game", "Tools.Editor"), "Tools/Editor");
/// ```
#[must_use]
pub fn package_path(project: &str, namespace: &str) -> String {
    let relative = if namespace == project {
        ""
    } else {
        namespace
            .strip_prefix(project)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(namespace)
    };
    relative.replace('.', "/")
}

/// Name of a delegate signature function derived from the delegate type's native name.
#[must_use]
pub fn delegate_signature_name(delegate_name: &str) -> String {
    format!("{}__DelegateSignature", display_name(delegate_name))
}

/// Strip the compiler-generated backing field decoration, `<Name>k__BackingField` to `Name`.
#[must_use]
pub fn backing_field_property(field_name: &str) -> Option<&str> {
    field_name
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix(">k__BackingField"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes() {
        assert_eq!(display_name("UMyObject"), "MyObject");
        assert_eq!(display_name("EMode"), "Mode");
        assert_eq!(display_name("IInteractable"), "Interactable");
        assert_eq!(display_name("Ability"), "Ability");
        assert_eq!(display_name("A"), "A");
        assert_eq!(display_name("TArray`1"), "TArray");
    }

    #[test]
    fn paths() {
        assert_eq!(native_path("Game", "MyActor"), "/Script/Game.MyActor");
        assert_eq!(
            member_path("/Script/Game.MyActor", "Fire"),
            "/Script/Game.MyActor:Fire"
        );
        assert_eq!(delegate_signature_name("FOnHit"), "OnHit__DelegateSignature");
    }

    #[test]
    fn backing_fields() {
        assert_eq!(backing_field_property("<Health>k__BackingField"), Some("Health"));
        assert_eq!(backing_field_property("Health"), None);
    }
}
