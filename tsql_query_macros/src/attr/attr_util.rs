/// Whether `attr` is `#[name ...]` with a plain, single-segment path.
pub fn attr_has_simple_ident(attr: &syn::Attribute, name: &str) -> bool {
    let path = &attr.path;
    if path.leading_colon.is_some() {
        return false;
    }

    match path.segments.first() {
        Some(segment) if path.segments.len() == 1 => segment.ident == name,
        _ => false,
    }
}
