use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitInt, parse_macro_input};

const MAX_TAG: u64 = (1 << 30) - 1;

#[proc_macro_derive(Binpack, attributes(binpack))]
pub fn derive_binpack(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    derive_binpack_expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn derive_binpack_expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Generic types are not supported",
        ));
    }

    if is_custom(&input)? {
        return Ok(impl_binpack_custom(name));
    }

    match &input.data {
        Data::Struct(data_struct) => impl_binpack_struct(name, data_struct),
        Data::Enum(_) => Err(syn::Error::new_spanned(
            name,
            "Enums are only supported with #[binpack(custom)]",
        )),
        Data::Union(_) => Err(syn::Error::new_spanned(
            name,
            "Union types are not supported",
        )),
    }
}

fn is_custom(input: &DeriveInput) -> syn::Result<bool> {
    let mut custom = false;
    for attr in &input.attrs {
        if attr.path().is_ident("binpack") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("custom") {
                    custom = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `custom`"))
                }
            })?;
        }
    }
    Ok(custom)
}

fn impl_binpack_custom(name: &syn::Ident) -> proc_macro2::TokenStream {
    quote! {
        impl binpack::Binpack for #name {
            fn write_value(&self, buffer: &mut Vec<u8>) -> binpack::EncodeResult<()> {
                binpack::marshal_with_hook(self, buffer)
            }

            fn read_value(&mut self, data: binpack::Bytes) -> binpack::DecodeResult<()> {
                binpack::unmarshal_with_hook(self, data)
            }

            fn is_default(&self) -> bool {
                binpack::Marshaler::is_zero(self)
            }
        }
    }
}

struct TaggedField {
    index: usize,
    ident: syn::Ident,
    ty: syn::Type,
    tag: u32,
    pack: bool,
}

/// Reads `#[binpack(tag = N)]` or `#[binpack(tag = N, pack)]` from a field.
/// Fields without the attribute are not encoded.
fn parse_field_attr(field: &syn::Field) -> syn::Result<Option<(u32, bool)>> {
    let mut result = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("binpack") {
            continue;
        }
        if result.is_some() {
            return Err(syn::Error::new_spanned(attr, "Duplicate #[binpack] attribute"));
        }

        let mut tag = None;
        let mut pack = false;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                let lit: LitInt = meta.value()?.parse()?;
                let value: u64 = lit.base10_parse()?;
                if value > MAX_TAG {
                    return Err(syn::Error::new_spanned(
                        &lit,
                        format!("tag must be at most {MAX_TAG}"),
                    ));
                }
                tag = Some(value as u32);
                Ok(())
            } else if meta.path.is_ident("pack") {
                pack = true;
                Ok(())
            } else {
                Err(meta.error("expected `tag = ...` or `pack`"))
            }
        })?;

        let Some(tag) = tag else {
            return Err(syn::Error::new_spanned(
                attr,
                "#[binpack] on a field requires `tag = ...`",
            ));
        };
        result = Some((tag, pack));
    }
    Ok(result)
}

fn impl_binpack_struct(
    name: &syn::Ident,
    data: &syn::DataStruct,
) -> syn::Result<proc_macro2::TokenStream> {
    let fields = match &data.fields {
        Fields::Named(fields) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Only named fields are supported",
            ));
        }
    };

    let mut tagged = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let Some((tag, pack)) = parse_field_attr(field)? else {
            continue;
        };
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        tagged.push(TaggedField {
            index,
            ident,
            ty: field.ty.clone(),
            tag,
            pack,
        });
    }

    let mut by_tag: Vec<&TaggedField> = tagged.iter().collect();
    by_tag.sort_by_key(|f| f.tag);
    for window in by_tag.windows(2) {
        if window[0].tag == window[1].tag {
            return Err(syn::Error::new_spanned(
                &window[1].ident,
                format!("Duplicate tag: {}", window[1].tag),
            ));
        }
    }

    let field_count = tagged.len();
    let descriptors = tagged.iter().map(|f| {
        let TaggedField {
            index,
            ident,
            ty,
            tag,
            pack,
        } = f;
        quote! {
            binpack::FieldDescriptor::new(
                #index,
                stringify!(#ident),
                #tag,
                <#ty as binpack::Binpack>::SHAPE,
                #pack,
            )
        }
    });

    let write_arms = tagged.iter().map(|TaggedField { index, ident, .. }| {
        quote! {
            #index => binpack::write_field(&self.#ident, field, buffer),
        }
    });

    let read_arms = tagged.iter().map(|TaggedField { index, ident, .. }| {
        quote! {
            #index => binpack::read_field(&mut self.#ident, field, data),
        }
    });

    let field_idents: Vec<_> = tagged.iter().map(|f| &f.ident).collect();

    let expanded = quote! {
        impl binpack::Binpack for #name {
            fn write_value(&self, buffer: &mut Vec<u8>) -> binpack::EncodeResult<()> {
                binpack::marshal_struct(self, buffer)
            }

            fn read_value(&mut self, data: binpack::Bytes) -> binpack::DecodeResult<()> {
                binpack::unmarshal_struct(self, data)
            }

            fn is_default(&self) -> bool {
                true #(&& binpack::Binpack::is_default(&self.#field_idents))*
            }
        }

        impl binpack::Structured for #name {
            fn schema() -> Result<&'static binpack::Schema, binpack::SchemaError> {
                static SCHEMA: std::sync::OnceLock<
                    Result<binpack::Schema, binpack::SchemaError>,
                > = std::sync::OnceLock::new();

                SCHEMA
                    .get_or_init(|| {
                        let fields: [binpack::FieldDescriptor; #field_count] = [#(#descriptors),*];
                        binpack::Schema::new(stringify!(#name), fields)
                    })
                    .as_ref()
                    .map_err(Clone::clone)
            }

            #[allow(unused_variables)]
            fn write_field(
                &self,
                field: &binpack::FieldDescriptor,
                buffer: &mut Vec<u8>,
            ) -> binpack::EncodeResult<()> {
                match field.index() {
                    #(#write_arms)*
                    _ => Ok(()),
                }
            }

            #[allow(unused_variables)]
            fn read_field(
                &mut self,
                field: &binpack::FieldDescriptor,
                data: binpack::Bytes,
            ) -> binpack::DecodeResult<()> {
                match field.index() {
                    #(#read_arms)*
                    _ => Ok(()),
                }
            }
        }
    };

    Ok(expanded)
}
