// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Derive macros for `hdds-cdr`.
//!
//! - `#[derive(CdrType)]` on a struct emits `CdrAggregate` (member ids,
//!   property tree, per-member dispatch) and `CdrValue`.
//! - `#[derive(CdrEnum)]` on a fieldless enum emits `CdrEnum` and `CdrValue`.
//!
//! The generated code refers to `::hdds_cdr`, so the user crate must depend
//! on `hdds-cdr` under that name.

extern crate proc_macro;

use md5::{Digest, Md5};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, ExprArray, Fields, GenericArgument,
    Ident, LitInt, LitStr, PathArguments, Type,
};

/// Member id assignment of a struct (`@autoid`).
#[derive(Clone, Copy, PartialEq, Eq)]
enum AutoId {
    Sequential,
    Hash,
}

/// How a field obtained its member id.
enum MemberId {
    /// `counter + offset` where counter is the base's `NEXT_MEMBER_ID` or 0
    Sequential(u32),
    Explicit(u32),
    Hash(u32),
}

struct StructAttrs {
    extensibility: TokenStream2,
    autoid: AutoId,
}

#[derive(Default)]
struct FieldAttrs {
    id: Option<u32>,
    /// `Some(None)`: hash of the field name. `Some(Some(s))`: hash of `s`.
    hashid: Option<Option<String>>,
    key: bool,
    must_understand: bool,
    bounds: Vec<u32>,
    base: bool,
}

struct Member {
    ident: Ident,
    ty: Type,
    id: TokenStream2,
    const_name: Ident,
    optional: bool,
    key: bool,
    must_understand: bool,
    bounds: Vec<u32>,
}

/// XTypes `@hashid`: first 4 bytes of MD5(name) read little-endian, masked to
/// 28 bits.
fn hash_member_id(name: &str) -> u32 {
    let digest = Md5::digest(name.as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) & 0x0FFF_FFFF
}

fn is_option(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    let Some(last) = path.path.segments.last() else {
        return false;
    };
    last.ident == "Option"
        && matches!(
            &last.arguments,
            PathArguments::AngleBracketed(args)
                if matches!(args.args.first(), Some(GenericArgument::Type(_)))
        )
}

fn parse_struct_attrs(attrs: &[Attribute]) -> syn::Result<StructAttrs> {
    let mut parsed = StructAttrs {
        extensibility: quote!(::hdds_cdr::Extensibility::Final),
        autoid: AutoId::Sequential,
    };
    for attr in attrs.iter().filter(|a| a.path().is_ident("cdr")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("extensibility") {
                let value: LitStr = meta.value()?.parse()?;
                parsed.extensibility = match value.value().as_str() {
                    "final" => quote!(::hdds_cdr::Extensibility::Final),
                    "appendable" => quote!(::hdds_cdr::Extensibility::Appendable),
                    "mutable" => quote!(::hdds_cdr::Extensibility::Mutable),
                    _ => {
                        return Err(meta.error(
                            "expected extensibility = \"final\" | \"appendable\" | \"mutable\"",
                        ))
                    }
                };
                Ok(())
            } else if meta.path.is_ident("autoid") {
                let value: LitStr = meta.value()?.parse()?;
                parsed.autoid = match value.value().as_str() {
                    "sequential" => AutoId::Sequential,
                    "hash" => AutoId::Hash,
                    _ => return Err(meta.error("expected autoid = \"sequential\" | \"hash\"")),
                };
                Ok(())
            } else {
                Err(meta.error("unsupported cdr attribute"))
            }
        })?;
    }
    Ok(parsed)
}

fn parse_bounds(array: &ExprArray) -> syn::Result<Vec<u32>> {
    array
        .elems
        .iter()
        .map(|elem| match elem {
            Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Int(int),
                ..
            }) => int.base10_parse::<u32>(),
            other => Err(syn::Error::new_spanned(other, "bound must be an integer literal")),
        })
        .collect()
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("cdr")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                let value: LitInt = meta.value()?.parse()?;
                parsed.id = Some(value.base10_parse()?);
            } else if meta.path.is_ident("hashid") {
                if meta.input.peek(syn::Token![=]) {
                    let value: LitStr = meta.value()?.parse()?;
                    parsed.hashid = Some(Some(value.value()));
                } else {
                    parsed.hashid = Some(None);
                }
            } else if meta.path.is_ident("key") {
                parsed.key = true;
            } else if meta.path.is_ident("must_understand") {
                parsed.must_understand = true;
            } else if meta.path.is_ident("bound") {
                let value: LitInt = meta.value()?.parse()?;
                parsed.bounds = vec![value.base10_parse()?];
            } else if meta.path.is_ident("bounds") {
                let value: ExprArray = meta.value()?.parse()?;
                parsed.bounds = parse_bounds(&value)?;
            } else if meta.path.is_ident("base") {
                parsed.base = true;
            } else {
                return Err(meta.error("unsupported cdr field attribute"));
            }
            Ok(())
        })?;
    }
    if parsed.id.is_some() && parsed.hashid.is_some() {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "id and hashid are mutually exclusive",
        ));
    }
    Ok(parsed)
}

/// `match prop.member_id { id if id == Self::X => ..., _ => fallback }`
fn dispatch(
    members: &[Member],
    arm: impl Fn(&Member) -> TokenStream2,
    fallback: TokenStream2,
) -> TokenStream2 {
    let arms = members.iter().map(|m| {
        let const_name = &m.const_name;
        let body = arm(m);
        quote! { id if id == Self::#const_name => #body, }
    });
    quote! {
        match prop.member_id {
            #(#arms)*
            _ => #fallback,
        }
    }
}

/// `#[derive(CdrType)]`: CDR streaming glue for a struct.
///
/// Struct attributes:
/// - `#[cdr(extensibility = "final" | "appendable" | "mutable")]` (default final)
/// - `#[cdr(autoid = "sequential" | "hash")]` (default sequential)
///
/// Field attributes:
/// - `#[cdr(id = N)]`: explicit member id; following fields continue at N+1
/// - `#[cdr(hashid)]` / `#[cdr(hashid = "name")]`: id from the MD5 of a name
/// - `#[cdr(key)]`, `#[cdr(must_understand)]`
/// - `#[cdr(bound = N)]`, `#[cdr(bounds = [N, M])]`: string/sequence bounds,
///   outer first
/// - `#[cdr(base)]`: the field holds the base type; its members are
///   flattened in front of the declared ones
///
/// `Option<T>` fields are optional members.
///
/// # Panics
///
/// Never; invalid input becomes a compile error.
///
/// Example:
/// ```ignore
/// use hdds_cdr::CdrType;
///
/// #[derive(CdrType, Default)]
/// #[cdr(extensibility = "mutable")]
/// struct Sensor {
///     #[cdr(key)]
///     id: u32,
///     #[cdr(bound = 32)]
///     label: String,
///     reading: Option<f64>,
/// }
/// ```
#[proc_macro_derive(CdrType, attributes(cdr))]
#[allow(clippy::too_many_lines)]
pub fn derive_cdr_type(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_cdr_type(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_cdr_type(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "CdrType cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Only named fields are supported",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(input, "Only structs are supported")),
    };

    let struct_attrs = parse_struct_attrs(&input.attrs)?;

    let mut base: Option<(Ident, Type)> = None;
    let mut members = Vec::new();
    // Sequential ids: counter = `start + offset`; an explicit id rebases it.
    let mut seq_start: Option<u32> = None;
    let mut seq_offset = 0u32;

    for field in fields {
        let Some(ident) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "Field must have a name"));
        };
        let attrs = parse_field_attrs(&field.attrs)?;
        let plain_name = ident.unraw().to_string();

        if attrs.base {
            if base.is_some() {
                return Err(syn::Error::new_spanned(field, "only one base field is allowed"));
            }
            if !members.is_empty() {
                return Err(syn::Error::new_spanned(field, "the base field must come first"));
            }
            base = Some((ident, field.ty.clone()));
            continue;
        }

        let member_id = match (attrs.id, &attrs.hashid) {
            (Some(id), _) => {
                seq_start = Some(id);
                seq_offset = 1;
                MemberId::Explicit(id)
            }
            (None, Some(Some(hash_name))) => MemberId::Hash(hash_member_id(hash_name)),
            (None, Some(None)) => MemberId::Hash(hash_member_id(&plain_name)),
            (None, None) if struct_attrs.autoid == AutoId::Hash => {
                MemberId::Hash(hash_member_id(&plain_name))
            }
            (None, None) => {
                let offset = seq_offset;
                seq_offset += 1;
                match seq_start {
                    Some(start) => MemberId::Explicit(start + offset),
                    None => MemberId::Sequential(offset),
                }
            }
        };

        let id = match (member_id, &base) {
            (MemberId::Sequential(offset), Some((_, base_ty))) => {
                quote! { <#base_ty as ::hdds_cdr::CdrAggregate>::NEXT_MEMBER_ID + #offset }
            }
            (MemberId::Sequential(id) | MemberId::Explicit(id) | MemberId::Hash(id), _) => {
                quote! { #id }
            }
        };

        members.push(Member {
            const_name: format_ident!("__CDR_ID_{}", plain_name.to_uppercase()),
            optional: is_option(&field.ty),
            ident,
            ty: field.ty.clone(),
            id,
            key: attrs.key,
            must_understand: attrs.must_understand,
            bounds: attrs.bounds,
        });
    }

    let next_member_id = match (seq_start, &base) {
        (Some(start), _) => quote! { #start + #seq_offset },
        (None, Some((_, base_ty))) => {
            quote! { <#base_ty as ::hdds_cdr::CdrAggregate>::NEXT_MEMBER_ID + #seq_offset }
        }
        (None, None) => quote! { #seq_offset },
    };

    let id_consts = members.iter().map(|m| {
        let const_name = &m.const_name;
        let id = &m.id;
        quote! { const #const_name: u32 = #id; }
    });

    let extensibility = &struct_attrs.extensibility;
    let push_members = members.iter().map(|m| {
        let ty = &m.ty;
        let const_name = &m.const_name;
        let optional = m.optional;
        let key = m.key;
        let must_understand = m.must_understand;
        quote! {
            props.push_member(
                ::hdds_cdr::member_props::<#ty>(Self::#const_name, #optional)
                    .key(#key)
                    .must_understand(#must_understand),
            );
        }
    });
    let append_base = base.as_ref().map(|(_, base_ty)| {
        quote! { props.append_base(&::hdds_cdr::get_type_props::<#base_ty>()); }
    });

    let bounds_of = |m: &Member| {
        let bounds = &m.bounds;
        quote! { &[#(#bounds),*] }
    };

    let optional_members: Vec<&Member> = members.iter().filter(|m| m.optional).collect();
    let presence_arms = optional_members.iter().map(|m| {
        let const_name = &m.const_name;
        let ident = &m.ident;
        quote! { id if id == Self::#const_name => self.#ident.is_some(), }
    });
    let presence_fallback = match &base {
        Some((base_ident, _)) => quote! { self.#base_ident.is_present(member_id) },
        None => quote! { true },
    };

    let read_body = dispatch(
        &members,
        |m| {
            let ident = &m.ident;
            let bounds = bounds_of(m);
            quote! { ::hdds_cdr::CdrValue::read_cdr(&mut self.#ident, stream, prop, #bounds) }
        },
        match &base {
            Some((base_ident, _)) => {
                quote! { ::hdds_cdr::CdrAggregate::read_member(&mut self.#base_ident, stream, prop) }
            },
            None => quote! { Ok(()) },
        },
    );
    let write_body = dispatch(
        &members,
        |m| {
            let ident = &m.ident;
            let bounds = bounds_of(m);
            quote! { ::hdds_cdr::CdrValue::write_cdr(&self.#ident, stream, prop, #bounds) }
        },
        match &base {
            Some((base_ident, _)) => {
                quote! { ::hdds_cdr::CdrAggregate::write_member(&self.#base_ident, stream, prop) }
            },
            None => quote! { Ok(()) },
        },
    );
    let move_body = dispatch(
        &members,
        |m| {
            let ident = &m.ident;
            let bounds = bounds_of(m);
            quote! { ::hdds_cdr::CdrValue::move_cdr(&self.#ident, stream, prop, #bounds) }
        },
        match &base {
            Some((base_ident, _)) => {
                quote! { ::hdds_cdr::CdrAggregate::move_member(&self.#base_ident, stream, prop) }
            },
            None => quote! { Ok(()) },
        },
    );
    let max_body = dispatch(
        &members,
        |m| {
            let ty = &m.ty;
            let bounds = bounds_of(m);
            quote! { <#ty as ::hdds_cdr::CdrValue>::max_cdr(stream, prop, #bounds) }
        },
        match &base {
            Some((_, base_ty)) => {
                quote! { <#base_ty as ::hdds_cdr::CdrAggregate>::max_member(stream, prop) }
            }
            None => quote! { Ok(()) },
        },
    );

    Ok(quote! {
        #[allow(non_upper_case_globals)]
        impl #name {
            #(#id_consts)*
        }

        impl ::hdds_cdr::CdrAggregate for #name {
            const NEXT_MEMBER_ID: u32 = #next_member_id;

            fn aggregate_props() -> ::hdds_cdr::EntityProperties {
                let mut props = ::hdds_cdr::EntityProperties::aggregate(
                    ::hdds_cdr::AggregateKind::Struct,
                    #extensibility,
                );
                #(#push_members)*
                #append_base
                props
            }

            #[allow(unreachable_patterns)]
            fn is_present(&self, member_id: u32) -> bool {
                match member_id {
                    #(#presence_arms)*
                    _ => #presence_fallback,
                }
            }

            fn read_member<'b, S: ::hdds_cdr::CdrStream<'b>>(
                &mut self,
                stream: &mut S,
                prop: &::hdds_cdr::EntityProperties,
            ) -> ::hdds_cdr::Result<()> {
                #read_body
            }

            fn write_member<'b, S: ::hdds_cdr::CdrStream<'b>>(
                &self,
                stream: &mut S,
                prop: &::hdds_cdr::EntityProperties,
            ) -> ::hdds_cdr::Result<()> {
                #write_body
            }

            fn move_member<'b, S: ::hdds_cdr::CdrStream<'b>>(
                &self,
                stream: &mut S,
                prop: &::hdds_cdr::EntityProperties,
            ) -> ::hdds_cdr::Result<()> {
                #move_body
            }

            fn max_member<'b, S: ::hdds_cdr::CdrStream<'b>>(
                stream: &mut S,
                prop: &::hdds_cdr::EntityProperties,
            ) -> ::hdds_cdr::Result<()> {
                #max_body
            }
        }

        impl ::hdds_cdr::CdrValue for #name {
            fn type_props() -> ::hdds_cdr::EntityProperties {
                <Self as ::hdds_cdr::CdrAggregate>::aggregate_props()
            }

            fn read_cdr<'b, S: ::hdds_cdr::CdrStream<'b>>(
                &mut self,
                stream: &mut S,
                props: &::hdds_cdr::EntityProperties,
                _bounds: &[u32],
            ) -> ::hdds_cdr::Result<()> {
                ::hdds_cdr::read_aggregate(self, stream, props)
            }

            fn write_cdr<'b, S: ::hdds_cdr::CdrStream<'b>>(
                &self,
                stream: &mut S,
                props: &::hdds_cdr::EntityProperties,
                _bounds: &[u32],
            ) -> ::hdds_cdr::Result<()> {
                ::hdds_cdr::write_aggregate(self, stream, props)
            }

            fn move_cdr<'b, S: ::hdds_cdr::CdrStream<'b>>(
                &self,
                stream: &mut S,
                props: &::hdds_cdr::EntityProperties,
                _bounds: &[u32],
            ) -> ::hdds_cdr::Result<()> {
                ::hdds_cdr::move_aggregate(self, stream, props)
            }

            fn max_cdr<'b, S: ::hdds_cdr::CdrStream<'b>>(
                stream: &mut S,
                props: &::hdds_cdr::EntityProperties,
                _bounds: &[u32],
            ) -> ::hdds_cdr::Result<()> {
                ::hdds_cdr::max_aggregate::<Self, S>(stream, props)
            }
        }
    })
}

/// `#[derive(CdrEnum)]`: wire glue for a fieldless enum.
///
/// `#[cdr(bit_bound = N)]` (1..=32, default 32) sets the XCDR2 width. The
/// enum must also implement `Copy` and `Default`; unknown received values
/// decode to the default enumerator.
///
/// Example:
/// ```ignore
/// #[derive(CdrEnum, Clone, Copy, Default)]
/// #[cdr(bit_bound = 8)]
/// enum Mode {
///     #[default]
///     Idle,
///     Run = 4,
/// }
/// ```
#[proc_macro_derive(CdrEnum, attributes(cdr))]
pub fn derive_cdr_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_cdr_enum(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_cdr_enum(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(input, "CdrEnum can only be derived for enums"));
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "CdrEnum cannot be derived for generic enums",
        ));
    }

    let mut bit_bound = 32u32;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("cdr")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("bit_bound") {
                let value: LitInt = meta.value()?.parse()?;
                bit_bound = value.base10_parse()?;
                if !(1..=32).contains(&bit_bound) {
                    return Err(meta.error("bit_bound must be within 1..=32"));
                }
                Ok(())
            } else {
                Err(meta.error("unsupported cdr attribute"))
            }
        })?;
    }

    let mut variants = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "CdrEnum variants cannot carry data",
            ));
        }
        variants.push(&variant.ident);
    }

    Ok(quote! {
        impl ::hdds_cdr::CdrEnum for #name {
            const BIT_BOUND: ::hdds_cdr::BitBound = ::hdds_cdr::BitBound::from_bits(#bit_bound);

            fn to_raw(self) -> u32 {
                self as u32
            }

            fn from_raw(raw: u32) -> Self {
                #(
                    if raw == #name::#variants as u32 {
                        return #name::#variants;
                    }
                )*
                <Self as ::core::default::Default>::default()
            }
        }

        impl ::hdds_cdr::CdrValue for #name {
            const IS_PRIMITIVE: bool = true;

            fn type_props() -> ::hdds_cdr::EntityProperties {
                ::hdds_cdr::codec::enums::enum_props::<Self>()
            }

            fn read_cdr<'b, S: ::hdds_cdr::CdrStream<'b>>(
                &mut self,
                stream: &mut S,
                _props: &::hdds_cdr::EntityProperties,
                _bounds: &[u32],
            ) -> ::hdds_cdr::Result<()> {
                *self = ::hdds_cdr::read_enum::<Self, S>(stream)?;
                Ok(())
            }

            fn write_cdr<'b, S: ::hdds_cdr::CdrStream<'b>>(
                &self,
                stream: &mut S,
                _props: &::hdds_cdr::EntityProperties,
                _bounds: &[u32],
            ) -> ::hdds_cdr::Result<()> {
                ::hdds_cdr::write_enum(stream, *self)
            }

            fn move_cdr<'b, S: ::hdds_cdr::CdrStream<'b>>(
                &self,
                stream: &mut S,
                _props: &::hdds_cdr::EntityProperties,
                _bounds: &[u32],
            ) -> ::hdds_cdr::Result<()> {
                ::hdds_cdr::move_enum::<Self, S>(stream)
            }

            fn max_cdr<'b, S: ::hdds_cdr::CdrStream<'b>>(
                stream: &mut S,
                _props: &::hdds_cdr::EntityProperties,
                _bounds: &[u32],
            ) -> ::hdds_cdr::Result<()> {
                ::hdds_cdr::move_enum::<Self, S>(stream)
            }
        }
    })
}
