//! Implementation of the Entity derive macro.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::ext::IdentExt;
use syn::{Attribute, Data, DeriveInput, Error, Fields, Ident, LitInt, LitStr, Result, Type};

/// Parsed entity definition from a struct with `#[derive(Entity)]`.
#[derive(Debug)]
pub struct EntityDef {
    /// The struct name.
    pub name: Ident,
    /// Schema qualifier from the struct or the identity field.
    pub schema: Option<String>,
    /// Fields in declaration order; the first is the identity.
    pub fields: Vec<EntityFieldDef>,
}

/// A single parsed field.
#[derive(Debug)]
pub struct EntityFieldDef {
    pub ident: Ident,
    pub ty: Type,
    pub len: Option<u32>,
    pub precision: Option<String>,
}

#[derive(Default)]
struct FieldAttrs {
    schema: Option<String>,
    len: Option<u32>,
    precision: Option<String>,
}

/// Parse a `DeriveInput` into an `EntityDef`.
pub fn parse_entity(input: &DeriveInput) -> Result<EntityDef> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            other => {
                return Err(Error::new_spanned(
                    other,
                    "Entity requires a struct with named fields",
                ));
            }
        },
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not unions",
            ));
        }
    };

    let mut schema = parse_attrs(&input.attrs, true)?.schema;
    let mut fields = Vec::with_capacity(named.len());

    for (index, field) in named.iter().enumerate() {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;
        let attrs = parse_attrs(&field.attrs, index == 0)?;

        if index == 0 {
            if !ident.unraw().to_string().eq_ignore_ascii_case("id") {
                return Err(Error::new_spanned(
                    &ident,
                    "the first field of an Entity must be the i64 identity `id`",
                ));
            }
            if attrs.schema.is_some() {
                schema = attrs.schema;
            }
        }

        fields.push(EntityFieldDef {
            ident,
            ty: field.ty.clone(),
            len: attrs.len,
            precision: attrs.precision,
        });
    }

    if fields.is_empty() {
        return Err(Error::new_spanned(
            &input.ident,
            "Entity requires at least the identity field `id`",
        ));
    }

    Ok(EntityDef {
        name: input.ident.clone(),
        schema,
        fields,
    })
}

/// Parse `#[srm(...)]` attributes. `schema` is only accepted where `allow_schema` is set.
fn parse_attrs(attrs: &[Attribute], allow_schema: bool) -> Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("srm") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("schema") && allow_schema {
                let value: LitStr = meta.value()?.parse()?;
                parsed.schema = Some(value.value());
            } else if path.is_ident("len") {
                let value: LitInt = meta.value()?.parse()?;
                parsed.len = Some(value.base10_parse()?);
            } else if path.is_ident("precision") {
                let value: LitStr = meta.value()?.parse()?;
                parsed.precision = Some(value.value());
            } else {
                let attr_name = path.to_token_stream().to_string();
                let hint = if attr_name == "schema" {
                    "`schema` belongs on the struct or on the identity field"
                } else {
                    "valid attributes are: schema, len, precision"
                };
                return Err(Error::new_spanned(
                    path,
                    format!("unknown srm attribute `{attr_name}`; {hint}"),
                ));
            }

            Ok(())
        })?;
    }

    Ok(parsed)
}

/// Generate the `Entity` and `FieldType` impls.
pub fn generate_entity_impl(def: &EntityDef) -> TokenStream {
    let name = &def.name;
    let name_str = name.unraw().to_string();
    let id_ident = &def.fields[0].ident;

    let schema = match &def.schema {
        Some(s) => quote! { ::core::option::Option::Some(#s) },
        None => quote! { ::core::option::Option::None },
    };

    let field_defs = def.fields.iter().map(|f| {
        let column = f.ident.unraw().to_string();
        let ty = &f.ty;
        let len = f.len.map(|n| quote! { .len(#n) });
        let precision = f.precision.as_ref().map(|p| quote! { .precision(#p) });
        quote! {
            ::srm_core::FieldDef::new(#column, <#ty as ::srm_core::FieldType>::KIND) #len #precision
        }
    });

    let to_values = def.fields.iter().map(|f| {
        let ident = &f.ident;
        quote! { ::srm_core::FieldType::to_value(&self.#ident) }
    });

    let from_record = def.fields.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let column = f.ident.unraw().to_string();
        quote! { #ident: reader.next_field::<#ty>(#column)? }
    });

    quote! {
        impl ::srm_core::Entity for #name {
            fn descriptor() -> &'static ::srm_core::EntityDescriptor {
                static FIELDS: &[::srm_core::FieldDef] = &[#(#field_defs),*];
                static DESCRIPTOR: ::srm_core::EntityDescriptor =
                    ::srm_core::EntityDescriptor::new(#name_str, #schema, FIELDS);
                &DESCRIPTOR
            }

            fn id(&self) -> i64 {
                self.#id_ident
            }

            fn set_id(&mut self, id: i64) {
                self.#id_ident = id;
            }

            fn to_values(&self) -> ::std::vec::Vec<::srm_core::Value> {
                ::std::vec![#(#to_values),*]
            }

            fn from_record(record: ::srm_core::Record) -> ::srm_core::Result<Self> {
                let mut reader = record.into_reader();
                ::core::result::Result::Ok(Self {
                    #(#from_record),*
                })
            }
        }

        impl ::srm_core::FieldType for #name {
            const KIND: ::srm_core::FieldKind =
                ::srm_core::FieldKind::Reference(<#name as ::srm_core::Entity>::descriptor);

            fn to_value(&self) -> ::srm_core::Value {
                ::srm_core::Value::BigInt(<Self as ::srm_core::Entity>::id(self))
            }

            fn from_slot(slot: ::srm_core::Slot) -> ::srm_core::Result<Self> {
                ::srm_core::entity::reference_from_slot(slot)
            }
        }
    }
}
