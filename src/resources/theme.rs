//! `authsignal_theme`: the tenant's pre-built UI theme.
//!
//! A tenant always has exactly one theme, so it can only be imported and then
//! updated. Deleting it resets every field.
//!
//! State uses single nested blocks for each theme section. Reading flattens
//! the API shape so that empty strings, zero integers and sections with
//! nothing set all become `null`. Writing goes the other way and always sends
//! every section, so a removed block clears the remote values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{found, from_state, read_only, to_state};
use super::{DataSource, Resource};
use crate::client::{
    Borders, Colors, Container, DarkMode, Display, ManagementApi, Nullable, PageBackground, Theme,
    Typography, WriteMode,
};
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema, Validator};

const TYPE_NAME: &str = "authsignal_theme";

/// A theme section: its state block and its API body.
trait Section: Sized + Default + PartialEq {
    type Api;

    fn block() -> Block;

    /// `None` when nothing in the section is set.
    fn flatten(api: &Self::Api) -> Option<Self>;

    fn unflatten(state: Option<&Self>, mode: WriteMode) -> Self::Api;
}

fn flatten_section<S: Section>(field: &Nullable<S::Api>) -> Option<S> {
    field.as_value().and_then(S::flatten)
}

fn section_value<S: Section>(state: Option<&S>, mode: WriteMode) -> Nullable<S::Api> {
    Nullable::Value(S::unflatten(state, mode))
}

fn single<S: Section>() -> NestedBlock {
    NestedBlock::single(S::block())
}

/// Declare a section of scalar fields.
macro_rules! section {
    (
        $state:ident <=> $api:ident {
            $( $field:ident: $ty:ty => $attr:expr, )*
        }
    ) => {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        struct $state {
            $( $field: Option<$ty>, )*
        }

        impl Section for $state {
            type Api = $api;

            fn block() -> Block {
                Block::new() $( .with_attribute(stringify!($field), $attr) )*
            }

            fn flatten(api: &$api) -> Option<Self> {
                let state = Self {
                    $( $field: api.$field.meaningful(), )*
                };
                (state != Self::default()).then_some(state)
            }

            fn unflatten(state: Option<&Self>, mode: WriteMode) -> $api {
                $api {
                    $( $field: mode.apply(state.and_then(|s| s.$field.clone())), )*
                }
            }
        }
    };
}

section! {
    ColorsState <=> Colors {
        button_primary_text: String => Attribute::optional_string(),
        button_primary_border: String => Attribute::optional_string(),
        button_secondary_text: String => Attribute::optional_string(),
        button_secondary_background: String => Attribute::optional_string(),
        button_secondary_border: String => Attribute::optional_string(),
        card_background: String => Attribute::optional_string(),
        card_border: String => Attribute::optional_string(),
        input_background: String => Attribute::optional_string(),
        input_border: String => Attribute::optional_string(),
        link: String => Attribute::optional_string(),
        heading_text: String => Attribute::optional_string(),
        body_text: String => Attribute::optional_string(),
        container_background: String => Attribute::optional_string(),
        container_border: String => Attribute::optional_string(),
        divider: String => Attribute::optional_string(),
        icon: String => Attribute::optional_string(),
        loader: String => Attribute::optional_string(),
        positive: String => Attribute::optional_string(),
        critical: String => Attribute::optional_string(),
        information: String => Attribute::optional_string(),
        hover: String => Attribute::optional_string(),
        focus: String => Attribute::optional_string(),
    }
}

section! {
    ContainerState <=> Container {
        content_alignment: String => Attribute::optional_string()
            .with_validator(Validator::one_of(&["left", "center"])),
        position: String => Attribute::optional_string()
            .with_validator(Validator::one_of(&["inside", "outside"])),
        padding: i64 => Attribute::optional_int64(),
        logo_alignment: String => Attribute::optional_string()
            .with_validator(Validator::one_of(&["left", "center"])),
        logo_position: String => Attribute::optional_string()
            .with_validator(Validator::one_of(&["inside", "outside"])),
        logo_height: i64 => Attribute::optional_int64(),
    }
}

section! {
    BordersState <=> Borders {
        button_border_radius: i64 => Attribute::optional_int64(),
        button_border_width: i64 => Attribute::optional_int64(),
        card_border_radius: i64 => Attribute::optional_int64(),
        card_border_width: i64 => Attribute::optional_int64(),
        input_border_radius: i64 => Attribute::optional_int64(),
        input_border_width: i64 => Attribute::optional_int64(),
        container_border_radius: i64 => Attribute::optional_int64(),
    }
}

section! {
    DisplayState <=> Display {
        font_url: String => Attribute::optional_string(),
    }
}

section! {
    PageBackgroundState <=> PageBackground {
        background_color: String => Attribute::optional_string(),
        background_image_url: String => Attribute::optional_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct TypographyState {
    display: Option<DisplayState>,
}

impl Section for TypographyState {
    type Api = Typography;

    fn block() -> Block {
        Block::new().with_block("display", single::<DisplayState>())
    }

    fn flatten(api: &Typography) -> Option<Self> {
        flatten_section(&api.display).map(|display| Self { display: Some(display) })
    }

    fn unflatten(state: Option<&Self>, mode: WriteMode) -> Typography {
        Typography {
            display: section_value(state.and_then(|s| s.display.as_ref()), mode),
        }
    }
}

/// The fields shared by the theme and its dark mode overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct AppearanceState {
    logo_url: Option<String>,
    watermark_url: Option<String>,
    favicon_url: Option<String>,
    primary_color: Option<String>,
    colors: Option<ColorsState>,
    container: Option<ContainerState>,
    borders: Option<BordersState>,
    typography: Option<TypographyState>,
    page_background: Option<PageBackgroundState>,
}

/// Build an [`AppearanceState`] from a [`Theme`] or [`DarkMode`] body.
macro_rules! flatten_appearance {
    ($api:expr) => {{
        let api = $api;
        AppearanceState {
            logo_url: api.logo_url.meaningful(),
            watermark_url: api.watermark_url.meaningful(),
            favicon_url: api.favicon_url.meaningful(),
            primary_color: api.primary_color.meaningful(),
            colors: flatten_section(&api.colors),
            container: flatten_section(&api.container),
            borders: flatten_section(&api.borders),
            typography: flatten_section(&api.typography),
            page_background: flatten_section(&api.page_background),
        }
    }};
}

/// Build a [`Theme`] or [`DarkMode`] body from an optional [`AppearanceState`].
macro_rules! unflatten_appearance {
    ($api:ident, $state:expr, $mode:expr $(, $extra:ident: $value:expr)*) => {{
        let state: Option<&AppearanceState> = $state;
        let mode: WriteMode = $mode;
        $api {
            logo_url: mode.apply(state.and_then(|s| s.logo_url.clone())),
            watermark_url: mode.apply(state.and_then(|s| s.watermark_url.clone())),
            favicon_url: mode.apply(state.and_then(|s| s.favicon_url.clone())),
            primary_color: mode.apply(state.and_then(|s| s.primary_color.clone())),
            colors: section_value(state.and_then(|s| s.colors.as_ref()), mode),
            container: section_value(state.and_then(|s| s.container.as_ref()), mode),
            borders: section_value(state.and_then(|s| s.borders.as_ref()), mode),
            typography: section_value(state.and_then(|s| s.typography.as_ref()), mode),
            page_background: section_value(state.and_then(|s| s.page_background.as_ref()), mode),
            $( $extra: $value, )*
        }
    }};
}

fn appearance_block() -> Block {
    Block::new()
        .with_attribute("logo_url", Attribute::optional_string())
        .with_attribute("watermark_url", Attribute::optional_string())
        .with_attribute("favicon_url", Attribute::optional_string())
        .with_attribute("primary_color", Attribute::optional_string())
        .with_block("colors", single::<ColorsState>())
        .with_block("container", single::<ContainerState>())
        .with_block("borders", single::<BordersState>())
        .with_block("typography", single::<TypographyState>())
        .with_block("page_background", single::<PageBackgroundState>())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct ThemeState {
    name: Option<String>,
    #[serde(flatten)]
    appearance: AppearanceState,
    dark_mode: Option<AppearanceState>,
}

impl ThemeState {
    fn flatten(theme: &Theme) -> Self {
        let dark_mode = theme
            .dark_mode
            .as_value()
            .map(|dark| flatten_appearance!(dark))
            .filter(|dark| *dark != AppearanceState::default());

        Self {
            name: theme.name.meaningful(),
            appearance: flatten_appearance!(theme),
            dark_mode,
        }
    }

    fn unflatten(&self, mode: WriteMode) -> Theme {
        let name = match mode {
            WriteMode::Clear => Nullable::Unset,
            _ => mode.apply(self.name.clone()),
        };
        let dark_mode = unflatten_appearance!(DarkMode, self.dark_mode.as_ref(), mode);

        unflatten_appearance!(
            Theme,
            Some(&self.appearance),
            mode,
            name: name,
            dark_mode: Nullable::Value(dark_mode)
        )
    }
}

fn resource_schema() -> Schema {
    let block = appearance_block()
        .with_description(
            "Manages the tenant theme. The theme must be imported before it can be managed.",
        )
        .with_attribute("name", Attribute::required_string())
        .with_block("dark_mode", NestedBlock::single(appearance_block()));
    Schema { version: 0, block }
}

/// The theme resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeResource;

#[async_trait]
impl Resource for ThemeResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        resource_schema()
    }

    async fn create(
        &self,
        _api: &dyn ManagementApi,
        _planned: Value,
    ) -> Result<Value, ProviderError> {
        Err(ProviderError::precondition(
            "Please import the existing theme",
            "Themes cannot be created, only updated. Import the existing theme and then try applying again.",
        ))
    }

    async fn read(
        &self,
        api: &dyn ManagementApi,
        _current: Value,
    ) -> Result<Option<Value>, ProviderError> {
        match found(api.get_theme().await, "Unable to Read Authsignal Theme")? {
            Some(theme) => Ok(Some(to_state(&ThemeState::flatten(&theme))?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        api: &dyn ManagementApi,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let state: ThemeState = from_state(planned)?;
        let updated = api
            .update_theme(&state.unflatten(WriteMode::Update))
            .await
            .map_err(|err| ProviderError::api("Error updating theme", err))?;
        debug!("updated theme");

        to_state(&ThemeState::flatten(&updated))
    }

    async fn delete(&self, api: &dyn ManagementApi, current: Value) -> Result<(), ProviderError> {
        let state: ThemeState = from_state(current)?;
        api.update_theme(&state.unflatten(WriteMode::Clear))
            .await
            .map_err(|err| ProviderError::api("Error resetting theme", err))?;
        debug!("reset theme");
        Ok(())
    }

    fn import_state(&self, id: &str) -> Result<Value, ProviderError> {
        Ok(json!({ "name": id }))
    }
}

/// Reads the tenant theme.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeDataSource;

#[async_trait]
impl DataSource for ThemeDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        read_only(resource_schema()).with_description("Reads the tenant theme.")
    }

    async fn read(&self, api: &dyn ManagementApi, _config: Value) -> Result<Value, ProviderError> {
        let theme = api
            .get_theme()
            .await
            .map_err(|err| ProviderError::api("Unable to Read Authsignal Theme", err))?;
        to_state(&ThemeState::flatten(&theme))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryApi;

    fn remote_theme() -> Theme {
        Theme {
            name: "Acme".to_string().into(),
            primary_color: "#112233".to_string().into(),
            logo_url: String::new().into(),
            container: Container {
                padding: 12.into(),
                position: "inside".to_string().into(),
                logo_height: 0.into(),
                ..Default::default()
            }
            .into(),
            borders: Borders {
                card_border_radius: 0.into(),
                ..Default::default()
            }
            .into(),
            typography: Typography {
                display: Display {
                    font_url: String::new().into(),
                }
                .into(),
            }
            .into(),
            dark_mode: DarkMode {
                primary_color: String::new().into(),
                ..Default::default()
            }
            .into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_flatten_nulls_empty_values_and_sections() {
        let state = to_state(&ThemeState::flatten(&remote_theme())).unwrap();

        assert_eq!(state["name"], "Acme");
        assert_eq!(state["primary_color"], "#112233");
        assert_eq!(state["logo_url"], Value::Null);
        assert_eq!(state["container"]["padding"], 12);
        assert_eq!(state["container"]["logo_height"], Value::Null);
        assert_eq!(state["borders"], Value::Null);
        assert_eq!(state["typography"], Value::Null);
        assert_eq!(state["dark_mode"], Value::Null);
        assert_eq!(state["colors"], Value::Null);
    }

    #[test]
    fn test_flatten_keeps_nested_display() {
        let theme = Theme {
            typography: Typography {
                display: Display {
                    font_url: "https://fonts.example/inter.woff2".to_string().into(),
                }
                .into(),
            }
            .into(),
            dark_mode: DarkMode {
                borders: Borders {
                    button_border_width: 2.into(),
                    ..Default::default()
                }
                .into(),
                ..Default::default()
            }
            .into(),
            ..Default::default()
        };

        let state = to_state(&ThemeState::flatten(&theme)).unwrap();
        assert_eq!(
            state["typography"],
            json!({"display": {"font_url": "https://fonts.example/inter.woff2"}})
        );
        assert_eq!(state["dark_mode"]["borders"]["button_border_width"], 2);
        assert_eq!(state["dark_mode"]["logo_url"], Value::Null);
    }

    #[test]
    fn test_update_body_sends_every_section() {
        let state: ThemeState = from_state(json!({
            "name": "Acme",
            "primary_color": "#000000",
            "logo_url": "",
            "container": {"padding": 8}
        }))
        .unwrap();

        let body = serde_json::to_value(state.unflatten(WriteMode::Update)).unwrap();
        assert_eq!(body["name"], "Acme");
        assert_eq!(body["primaryColor"], "#000000");
        assert_eq!(body["logoUrl"], Value::Null);
        assert_eq!(body["container"]["padding"], 8);
        assert_eq!(body["container"]["position"], Value::Null);
        assert_eq!(body["borders"]["cardBorderWidth"], Value::Null);
        assert_eq!(body["typography"], json!({"display": {"fontUrl": null}}));
        assert_eq!(body["darkMode"]["colors"]["link"], Value::Null);
        assert_eq!(body["darkMode"]["primaryColor"], Value::Null);
    }

    #[test]
    fn test_clear_body_leaves_name_alone() {
        let state: ThemeState = from_state(json!({
            "name": "Acme",
            "primary_color": "#000000",
            "dark_mode": {"logo_url": "https://cdn.example/dark.png"}
        }))
        .unwrap();

        let body = serde_json::to_value(state.unflatten(WriteMode::Clear)).unwrap();
        assert!(body.get("name").is_none());
        assert_eq!(body["primaryColor"], Value::Null);
        assert_eq!(body["darkMode"]["logoUrl"], Value::Null);
        assert_eq!(body["darkMode"]["pageBackground"]["backgroundColor"], Value::Null);
    }

    #[tokio::test]
    async fn test_create_requires_import() {
        let api = InMemoryApi::default();
        let err = ThemeResource.create(&api, json!({"name": "Acme"})).await.unwrap_err();

        let diag = err.to_diagnostic();
        assert_eq!(diag.summary, "Please import the existing theme");
        assert!(diag.detail.unwrap().contains("cannot be created"));
        assert!(api.theme().is_none());
    }

    #[tokio::test]
    async fn test_import_update_and_delete() {
        let api = InMemoryApi::default().with_theme(remote_theme());

        let imported = ThemeResource.import_state("Acme").unwrap();
        let state = ThemeResource.read(&api, imported).await.unwrap().unwrap();
        assert_eq!(state["container"]["position"], "inside");

        let mut next = state.clone();
        next["container"] = Value::Null;
        next["colors"] = json!({"link": "#0000ff"});

        let updated = ThemeResource.update(&api, state, next).await.unwrap();
        assert_eq!(updated["container"], Value::Null);
        assert_eq!(updated["colors"], json!({
            "button_primary_text": null, "button_primary_border": null,
            "button_secondary_text": null, "button_secondary_background": null,
            "button_secondary_border": null, "card_background": null, "card_border": null,
            "input_background": null, "input_border": null, "link": "#0000ff",
            "heading_text": null, "body_text": null, "container_background": null,
            "container_border": null, "divider": null, "icon": null, "loader": null,
            "positive": null, "critical": null, "information": null, "hover": null,
            "focus": null
        }));

        ThemeResource.delete(&api, updated).await.unwrap();
        let remote = api.theme().unwrap();
        assert_eq!(remote.name, Nullable::Value("Acme".to_string()));
        assert!(remote.primary_color.is_null());

        let read = ThemeResource.read(&api, json!({})).await.unwrap().unwrap();
        assert_eq!(read["colors"], Value::Null);
        assert_eq!(read["primary_color"], Value::Null);
    }

    #[tokio::test]
    async fn test_read_without_theme_is_gone() {
        let api = InMemoryApi::default();
        assert!(ThemeResource.read(&api, json!({})).await.unwrap().is_none());

        let err = ThemeDataSource.read(&api, json!({})).await.unwrap_err();
        assert_eq!(err.to_diagnostic().summary, "Unable to Read Authsignal Theme");
    }

    #[test]
    fn test_schema_shape() {
        let schema = ThemeResource.schema();
        assert!(schema.block.attributes["name"].flags.required);

        let dark = &schema.block.blocks["dark_mode"].block;
        assert!(dark.blocks.contains_key("typography"));
        assert!(!dark.blocks.contains_key("dark_mode"));
        assert_eq!(schema.block.blocks["colors"].block.attributes.len(), 22);

        let data_source = ThemeDataSource.schema();
        let display = &data_source.block.blocks["typography"].block.blocks["display"].block;
        assert!(display.attributes["font_url"].flags.is_computed_only());
    }
}
