use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Attribute, Data, DeriveInput, Error, Expr, Fields, Ident, LitStr, Result, Token, Type, parenthesized, parse_macro_input,
    token,
};

/// Derives `transom::TranslatedModel` for the translation struct of a model.
///
/// ```text
/// #[derive(TranslatedModel, Serialize, Deserialize)]
/// #[transom(app = "blog", model = "article")]
/// struct ArticleTranslation {
///     title: String,
///     #[transom(any_language)]
///     slug: String,
/// }
/// ```
///
/// Fields marked `#[transom(skip)]` stay out of the descriptor and are never
/// stored, so they must carry `#[serde(default)]` (or the struct must) for
/// stored translations to decode back into the struct.
///
/// Besides the descriptor, this generates an `ArticleTranslationFields` trait
/// implemented for `Translatable<ArticleTranslation>`, with one getter and one
/// `set_` method per field.
#[proc_macro_derive(TranslatedModel, attributes(transom))]
pub fn derive_translated_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ParsedModel::from_input(&input) {
        Ok(parsed) => parsed.emit().into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct ParsedModel {
    name: Ident,
    vis: syn::Visibility,
    app: String,
    model: String,
    fields: Vec<ParsedField>,
}

struct ParsedField {
    ident: Ident,
    name: String,
    ty: Type,
    any_language: bool,
}

impl ParsedModel {
    fn from_input(input: &DeriveInput) -> Result<Self> {
        let mut app: Option<String> = None;
        let mut model: Option<String> = None;

        for attr in &input.attrs {
            if attr.path().is_ident("transom") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("app") {
                        let value: LitStr = meta.value()?.parse()?;
                        app = Some(value.value());
                    } else if meta.path.is_ident("model") {
                        let value: LitStr = meta.value()?.parse()?;
                        model = Some(value.value());
                    } else {
                        return Err(meta.error("unknown transom option, expected `app` or `model`"));
                    }
                    Ok(())
                })?;
            }
        }

        let app = app.ok_or_else(|| {
            Error::new(
                input.ident.span(),
                "TranslatedModel requires #[transom(app = \"...\")] on the struct",
            )
        })?;
        let model = model.unwrap_or_else(|| snake_case(&input.ident.to_string()));

        let named = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => &named.named,
                _ => return Err(Error::new(input.ident.span(), "TranslatedModel requires named fields")),
            },
            _ => return Err(Error::new(input.ident.span(), "TranslatedModel can only be derived for structs")),
        };

        let container_default = serde_options(&input.attrs).iter().any(|name| name == "default");
        let mut fields = Vec::new();
        for field in named {
            let Some(ident) = field.ident.clone() else {
                continue;
            };
            let options = FieldOptions::from_attrs(&field.attrs)?;
            if options.skip {
                if !container_default && !serde_fills_field(&field.attrs) {
                    return Err(Error::new(
                        ident.span(),
                        "#[transom(skip)] fields are never stored, so they need \
                         #[serde(default)] (or #[serde(skip)]) to decode",
                    ));
                }
                continue;
            }
            fields.push(ParsedField {
                name: ident.to_string().trim_start_matches("r#").to_string(),
                ident,
                ty: field.ty.clone(),
                any_language: options.any_language,
            });
        }

        if fields.is_empty() {
            return Err(Error::new(
                input.ident.span(),
                "TranslatedModel needs at least one translated field",
            ));
        }

        Ok(Self {
            name: input.ident.clone(),
            vis: input.vis.clone(),
            app,
            model,
            fields,
        })
    }

    fn emit(&self) -> TokenStream2 {
        let name = &self.name;
        let vis = &self.vis;
        let app = &self.app;
        let model = &self.model;
        let fields_trait = format_ident!("{}Fields", name);

        let registrations = self.fields.iter().map(|field| {
            let field_name = &field.name;
            if field.any_language {
                quote! { .with_any_language_field(#field_name) }
            } else {
                quote! { .with_field(#field_name) }
            }
        });

        let signatures = self.fields.iter().map(|field| {
            let getter = &field.ident;
            let setter = format_ident!("set_{}", field.name);
            let ty = &field.ty;
            quote! {
                fn #getter(&mut self) -> ::transom::errors::TranslationResult<#ty>;
                fn #setter(&mut self, value: #ty) -> ::transom::errors::TranslationResult<()>;
            }
        });

        let bodies = self.fields.iter().map(|field| {
            let getter = &field.ident;
            let setter = format_ident!("set_{}", field.name);
            let field_name = &field.name;
            let ty = &field.ty;
            quote! {
                fn #getter(&mut self) -> ::transom::errors::TranslationResult<#ty> {
                    self.field_as::<#ty>(#field_name, ::std::option::Option::None)
                }

                fn #setter(&mut self, value: #ty) -> ::transom::errors::TranslationResult<()> {
                    self.set_field_as(#field_name, &value, ::std::option::Option::None)
                }
            }
        });

        let trait_doc = format!("Typed field accessors for `Translatable<{name}>` in the current language.");

        quote! {
            impl ::transom::types::TranslatedModel for #name {
                fn descriptor() -> ::transom::types::ModelDescriptor {
                    ::transom::types::ModelDescriptor::new(#app, #model)
                        #(#registrations)*
                }
            }

            #[doc = #trait_doc]
            #vis trait #fields_trait {
                #(#signatures)*
            }

            impl #fields_trait for ::transom::entity::Translatable<#name> {
                #(#bodies)*
            }
        }
    }
}

#[derive(Default)]
struct FieldOptions {
    any_language: bool,
    skip: bool,
}

impl FieldOptions {
    fn from_attrs(attrs: &[Attribute]) -> Result<Self> {
        let mut options = Self::default();
        for attr in attrs {
            if !attr.path().is_ident("transom") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("any_language") {
                    options.any_language = true;
                } else if meta.path.is_ident("skip") {
                    options.skip = true;
                } else {
                    return Err(meta.error("unknown transom field option, expected `any_language` or `skip`"));
                }
                Ok(())
            })?;
        }
        Ok(options)
    }
}

/// Names of the options inside `#[serde(...)]` attributes.
///
/// Serde validates its own attributes, so anything this cannot parse is ignored.
fn serde_options(attrs: &[Attribute]) -> Vec<String> {
    let mut names = Vec::new();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(ident) = meta.path.get_ident() {
                names.push(ident.to_string());
            }
            if meta.input.peek(Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            } else if meta.input.peek(token::Paren) {
                let content;
                parenthesized!(content in meta.input);
                let _: TokenStream2 = content.parse()?;
            }
            Ok(())
        });
    }
    names
}

fn serde_fills_field(attrs: &[Attribute]) -> bool {
    serde_options(attrs)
        .iter()
        .any(|name| matches!(name.as_str(), "default" | "skip" | "skip_deserializing"))
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
