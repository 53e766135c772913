use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Attribute, DataStruct, DeriveInput, Expr, ExprLit, Field, Fields, GenericArgument, Lit, LitStr,
    Meta, PathArguments, Result, Token, Type, punctuated::Punctuated,
};

const PRIMARY_KEY: &str = "_id";

/// How the primary key is held by the struct.
enum IdShape {
    Optional,
    Required,
}

pub(crate) fn generate_document_for_struct(ast: &DeriveInput, data: &DataStruct) -> Result<TokenStream> {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let fields = match &data.fields {
        Fields::Named(fields) => &fields.named,
        _ => return Err(syn::Error::new_spanned(ast, "only structs with named fields are supported")),
    };

    let collection = collection_name(ast)?;
    let rename_all = rename_rule(ast)?;

    let mut id_field: Option<&Field> = None;
    for field in fields {
        if has_id_marker(field)? {
            if id_field.is_some() {
                return Err(syn::Error::new_spanned(field, "multiple #[document(id)] fields are not allowed"));
            }
            id_field = Some(field);
        }
    }

    let id_field = match id_field {
        Some(field) => field,
        None => fields
            .iter()
            .find(|field| serialized_name(field, rename_all).ok().flatten().as_deref() == Some(PRIMARY_KEY))
            .or_else(|| fields.iter().find(|field| field.ident.as_ref().is_some_and(|ident| ident == "id")))
            .ok_or_else(|| syn::Error::new_spanned(ast, "no primary key field, mark one with #[document(id)]"))?,
    };

    if serialized_name(id_field, rename_all)?.as_deref() != Some(PRIMARY_KEY) {
        return Err(syn::Error::new_spanned(
            id_field,
            "the primary key must serialize as `_id`, add #[serde(rename = \"_id\")]",
        ));
    }

    let shape = match id_shape(&id_field.ty) {
        Some(shape) => shape,
        None => {
            return Err(syn::Error::new_spanned(
                &id_field.ty,
                "the primary key must be an `ObjectId` or `Option<ObjectId>`",
            ));
        }
    };

    let mut id_paths = vec![PRIMARY_KEY.to_string()];
    for field in fields {
        if std::ptr::eq(field, id_field) || id_shape(&field.ty).is_none() {
            continue;
        }
        if let Some(path) = serialized_name(field, rename_all)? {
            id_paths.push(path);
        }
    }

    let id_ident = &id_field.ident;
    let (id_getter, id_setter) = match shape {
        IdShape::Optional => (
            quote! { self.#id_ident.as_ref() },
            quote! { self.#id_ident = ::core::option::Option::Some(id); },
        ),
        IdShape::Required => (
            quote! { ::core::option::Option::Some(&self.#id_ident) },
            quote! { self.#id_ident = id; },
        ),
    };

    Ok(quote! {
        impl #impl_generics ::docmodel::document::Document for #name #ty_generics #where_clause {
            fn id(&self) -> ::core::option::Option<&::docmodel::id::ObjectId> {
                #id_getter
            }

            fn set_id(&mut self, id: ::docmodel::id::ObjectId) {
                #id_setter
            }

            fn collection_name() -> &'static str {
                #collection
            }

            fn id_paths() -> &'static [&'static str] {
                &[#(#id_paths),*]
            }
        }
    })
}

/// `#[document(collection = "...")]`, or the lowercased struct name with an `s` appended.
fn collection_name(ast: &DeriveInput) -> Result<String> {
    let mut collection = None;

    for attr in ast.attrs.iter().filter(|attr| attr.path().is_ident("document")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("collection name must not be empty"));
                }
                collection = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unknown document attribute"))
            }
        })?;
    }

    Ok(collection.unwrap_or_else(|| format!("{}s", ast.ident.to_string().to_lowercase())))
}

fn has_id_marker(field: &Field) -> Result<bool> {
    let mut marked = false;

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("document")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                marked = true;
                Ok(())
            } else {
                Err(meta.error("unknown document field attribute"))
            }
        })?;
    }

    Ok(marked)
}

/// Field renaming applied by a container-level `#[serde(rename_all = "...")]`.
#[derive(Clone, Copy)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(value: &LitStr) -> Result<Self> {
        Ok(match value.value().as_str() {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            other => return Err(syn::Error::new_spanned(value, format!("unknown rename rule `{other}`"))),
        })
    }

    /// Renames a snake_case field name the way serde does.
    fn apply(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
            Self::Pascal => {
                let mut pascal = String::with_capacity(field.len());
                let mut capitalize = true;
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        pascal.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        pascal.push(ch);
                    }
                }
                pascal
            }
            Self::Camel => {
                let pascal = Self::Pascal.apply(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
        }
    }
}

/// The container-level `rename_all` rule, if any.
///
/// Only the single-rule form is understood; `rename_all(serialize = .., deserialize = ..)`
/// is rejected.
fn rename_rule(ast: &DeriveInput) -> Result<Option<RenameRule>> {
    let mut rule = None;

    for attr in ast.attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        for item in serde_items(attr)? {
            match item {
                Meta::NameValue(pair) if pair.path.is_ident("rename_all") => match &pair.value {
                    Expr::Lit(ExprLit { lit: Lit::Str(value), .. }) => rule = Some(RenameRule::parse(value)?),
                    other => return Err(syn::Error::new_spanned(other, "expected a string literal")),
                },
                Meta::List(list) if list.path.is_ident("rename_all") => {
                    return Err(syn::Error::new_spanned(
                        list,
                        "separate serialize and deserialize rename rules are not supported",
                    ));
                }
                _ => {}
            }
        }
    }

    Ok(rule)
}

/// The key a field is serialized under, honoring `#[serde(rename = "...")]` and the
/// container's `rename_all` rule.
fn serialized_name(field: &Field, rename_all: Option<RenameRule>) -> Result<Option<String>> {
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        if let Some(rename) = serde_rename(attr)? {
            return Ok(Some(rename));
        }
    }

    Ok(field.ident.as_ref().map(|ident| {
        let name = ident.to_string().trim_start_matches("r#").to_string();
        match rename_all {
            Some(rule) => rule.apply(&name),
            None => name,
        }
    }))
}

fn serde_rename(attr: &Attribute) -> Result<Option<String>> {
    let rename = serde_items(attr)?.into_iter().find_map(|item| match item {
        Meta::NameValue(pair) if pair.path.is_ident("rename") => match pair.value {
            Expr::Lit(ExprLit { lit: Lit::Str(value), .. }) => Some(value.value()),
            _ => None,
        },
        _ => None,
    });

    Ok(rename)
}

fn serde_items(attr: &Attribute) -> Result<Punctuated<Meta, Token![,]>> {
    attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
}

fn id_shape(ty: &Type) -> Option<IdShape> {
    let segment = last_segment(ty)?;

    if segment.ident == "ObjectId" {
        return Some(IdShape::Required);
    }

    if segment.ident == "Option" {
        if let PathArguments::AngleBracketed(args) = &segment.arguments {
            if let Some(GenericArgument::Type(inner)) = args.args.first() {
                return last_segment(inner)
                    .filter(|inner| inner.ident == "ObjectId")
                    .map(|_| IdShape::Optional);
            }
        }
    }

    None
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        _ => None,
    }
}
