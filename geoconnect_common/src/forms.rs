//! Validation for the forms we accept from browsers and send to WorldMap.
//!
//! Errors are collected per field and rendered the way Django does it, since
//! WorldMap returns messages in the same format and our pages show both.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::prelude::*;

/// Raw submitted form fields.
pub type FormData = BTreeMap<String, String>;

/// The message for a missing required field.
pub const REQUIRED: &str = "This field is required.";

/// Separates a column name from its type in the classify form's attribute
/// choices, as in `"income|xsd:int"`.
pub const ATTRIBUTE_VALUE_DELIMITER: &str = "|";

/// The key used for errors which don't belong to one field.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Validation errors, keyed by field name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    /// Record an error for `field`.
    pub fn add<F, M>(&mut self, field: F, message: M)
    where
        F: Into<String>,
        M: Into<String>,
    {
        self.errors
            .entry(field.into())
            .or_insert_with(Vec::new)
            .push(message.into());
    }

    /// Did validation pass?
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors for a single field.
    pub fn get(&self, field: &str) -> &[String] {
        self.errors.get(field).map(|v| &v[..]).unwrap_or(&[])
    }

    /// Does `field` have any errors?
    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// The first error message, for places where we only show one line.
    pub fn first_message(&self) -> Option<&str> {
        self.errors
            .values()
            .flat_map(|msgs| msgs.iter())
            .map(|s| &s[..])
            .next()
    }

    /// Render as nested `<ul class="errorlist">` HTML.
    pub fn as_ul(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        let mut out = String::from(r#"<ul class="errorlist">"#);
        for (field, msgs) in &self.errors {
            out.push_str("<li>");
            out.push_str(&escape_html(field));
            out.push_str(r#"<ul class="errorlist">"#);
            for msg in msgs {
                out.push_str("<li>");
                out.push_str(&escape_html(msg));
                out.push_str("</li>");
            }
            out.push_str("</ul></li>");
        }
        out.push_str("</ul>");
        out
    }

    /// Return `Ok(value)` if there were no errors.
    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, msgs) in &self.errors {
            for msg in msgs {
                if !first {
                    write!(f, "; ")?;
                }
                first = false;
                write!(f, "{}: {}", field, msg)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

fn escape_html(s: &str) -> String {
    handlebars::html_escape(s)
}

/// Helper for pulling typed values out of `FormData`, recording errors as we
/// go.
struct Fields<'a> {
    data: &'a FormData,
    errors: FormErrors,
}

impl<'a> Fields<'a> {
    fn new(data: &'a FormData) -> Fields<'a> {
        Fields {
            data,
            errors: FormErrors::default(),
        }
    }

    fn optional(&self, name: &str) -> Option<String> {
        self.data
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_owned())
    }

    fn required(&mut self, name: &str) -> String {
        match self.optional(name) {
            Some(value) => value,
            None => {
                self.errors.add(name, REQUIRED);
                String::new()
            }
        }
    }

    fn parse_int<T: std::str::FromStr>(&mut self, name: &str, value: &str) -> Option<T> {
        match value.parse::<T>() {
            Ok(n) => Some(n),
            Err(_) => {
                self.errors.add(name, "Enter a whole number.");
                None
            }
        }
    }

    fn required_int<T: std::str::FromStr + Default>(&mut self, name: &str) -> T {
        match self.optional(name) {
            Some(value) => self.parse_int(name, &value).unwrap_or_default(),
            None => {
                self.errors.add(name, REQUIRED);
                T::default()
            }
        }
    }

    fn optional_int<T: std::str::FromStr>(&mut self, name: &str) -> Option<T> {
        let value = self.optional(name)?;
        self.parse_int(name, &value)
    }

    /// Checkboxes are absent when unchecked.
    fn checkbox(&self, name: &str) -> bool {
        match self.optional(name) {
            Some(value) => !matches!(
                value.to_ascii_lowercase().as_str(),
                "false" | "0" | "off" | "no"
            ),
            None => false,
        }
    }

    fn email(&mut self, name: &str) -> String {
        lazy_static! {
            static ref EMAIL: Regex =
                Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex");
        }
        let value = self.required(name);
        if !value.is_empty() && !EMAIL.is_match(&value) {
            self.errors.add(name, "Enter a valid email address.");
        }
        value
    }

    fn choice(&mut self, name: &str, choices: &[String]) -> String {
        let value = self.required(name);
        if !value.is_empty() && !choices.iter().any(|c| c == &value) {
            self.errors.add(
                name,
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    value
                ),
            );
        }
        value
    }
}

/// Information about a Dataverse file, posted along with the file itself.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataverseInfo {
    /// Dataverse user ID.
    pub dv_user_id: i32,
    /// Dataverse username, for display.
    pub dv_username: String,
    /// Where to send notifications.
    pub dv_user_email: String,
    /// The name of the Dataverse installation.
    pub dataverse_installation_name: String,
    /// The owning dataverse.
    pub dataverse_id: i32,
    /// The owning dataverse's name.
    pub dataverse_name: String,
    /// The dataset containing the file.
    pub dataset_id: i32,
    /// The dataset's name.
    pub dataset_name: String,
    /// The dataset citation.
    pub dataset_citation: String,
    /// The Dataverse file ID.
    pub datafile_id: i32,
    /// The file version, if known.
    pub datafile_version: Option<i64>,
    /// The file's label.
    pub datafile_label: String,
    /// The file's description.
    pub datafile_description: String,
    /// The file's MIME type.
    pub datafile_content_type: String,
    /// The checksum Dataverse expects for this file.
    pub datafile_expected_md5_checksum: String,
    /// Is access to the file restricted?
    pub datafile_is_restricted: bool,
    /// Link back to the dataset page.
    pub return_to_dataverse_url: String,
    /// Token for calling Dataverse on this user's behalf.
    pub dv_session_token: String,
}

impl DataverseInfo {
    /// Validate submitted fields.
    pub fn validate(data: &FormData) -> Result<DataverseInfo, FormErrors> {
        let mut f = Fields::new(data);
        let info = DataverseInfo {
            dv_user_id: f.required_int("dv_user_id"),
            dv_username: f.required("dv_username"),
            dv_user_email: f.email("dv_user_email"),
            dataverse_installation_name: f.required("dataverse_installation_name"),
            dataverse_id: f.required_int("dataverse_id"),
            dataverse_name: f.required("dataverse_name"),
            dataset_id: f.required_int("dataset_id"),
            dataset_name: f.required("dataset_name"),
            dataset_citation: f.optional("dataset_citation").unwrap_or_default(),
            datafile_id: f.required_int("datafile_id"),
            datafile_version: f.optional_int("datafile_version"),
            datafile_label: f.required("datafile_label"),
            datafile_description: f.optional("datafile_description").unwrap_or_default(),
            datafile_content_type: f.required("datafile_content_type"),
            datafile_expected_md5_checksum: f
                .optional("datafile_expected_md5_checksum")
                .unwrap_or_default(),
            datafile_is_restricted: f.checkbox("datafile_is_restricted"),
            return_to_dataverse_url: f.optional("return_to_dataverse_url").unwrap_or_default(),
            dv_session_token: f.optional("dv_session_token").unwrap_or_default(),
        };
        f.errors.finish(|| info)
    }

    /// The fields we forward to WorldMap. The session token stays with us.
    pub fn to_params(&self) -> FormData {
        let mut params = FormData::new();
        let mut put = |k: &str, v: String| {
            params.insert(k.to_owned(), v);
        };
        put("dv_user_id", self.dv_user_id.to_string());
        put("dv_username", self.dv_username.clone());
        put("dv_user_email", self.dv_user_email.clone());
        put(
            "dataverse_installation_name",
            self.dataverse_installation_name.clone(),
        );
        put("dataverse_id", self.dataverse_id.to_string());
        put("dataverse_name", self.dataverse_name.clone());
        put("dataset_id", self.dataset_id.to_string());
        put("dataset_name", self.dataset_name.clone());
        put("dataset_citation", self.dataset_citation.clone());
        put("datafile_id", self.datafile_id.to_string());
        if let Some(version) = self.datafile_version {
            put("datafile_version", version.to_string());
        }
        put("datafile_label", self.datafile_label.clone());
        put("datafile_description", self.datafile_description.clone());
        put("datafile_content_type", self.datafile_content_type.clone());
        put(
            "datafile_expected_md5_checksum",
            self.datafile_expected_md5_checksum.clone(),
        );
        put(
            "datafile_is_restricted",
            self.datafile_is_restricted.to_string(),
        );
        put(
            "return_to_dataverse_url",
            self.return_to_dataverse_url.clone(),
        );
        params
    }
}

impl From<&GisDataFile> for DataverseInfo {
    fn from(file: &GisDataFile) -> DataverseInfo {
        DataverseInfo {
            dv_user_id: file.dv_user_id,
            dv_username: file.dv_username.clone(),
            dv_user_email: file.dv_user_email.clone(),
            dataverse_installation_name: file.dataverse_installation_name.clone(),
            dataverse_id: file.dv_id,
            dataverse_name: file.dv_name.clone(),
            dataset_id: file.dataset_id,
            dataset_name: file.dataset_name.clone(),
            dataset_citation: file.dataset_citation.clone(),
            datafile_id: file.datafile_id,
            datafile_version: file.datafile_version,
            datafile_label: file.datafile_label.clone(),
            datafile_description: file.datafile_description.clone(),
            datafile_content_type: file.datafile_type.clone(),
            datafile_expected_md5_checksum: file.datafile_expected_md5_checksum.clone(),
            datafile_is_restricted: file.datafile_is_restricted,
            return_to_dataverse_url: file.return_to_dataverse_url.clone(),
            dv_session_token: file.dv_session_token.clone(),
        }
    }
}

/// The metadata WorldMap needs to import a shapefile.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShapefileImportData {
    /// Layer title.
    pub title: String,
    /// Layer abstract.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// The name of the shapefile set inside the zip.
    pub shapefile_name: String,
    /// Who to notify.
    pub dv_user_email: String,
}

impl ShapefileImportData {
    /// Validate submitted fields.
    pub fn validate(data: &FormData) -> Result<ShapefileImportData, FormErrors> {
        let mut f = Fields::new(data);
        let import = ShapefileImportData {
            title: f.required("title"),
            abstract_text: f.required("abstract"),
            shapefile_name: f.required("shapefile_name"),
            dv_user_email: f.email("dv_user_email"),
        };
        f.errors.finish(|| import)
    }

    /// Build the import data for a checked shapefile.
    pub fn for_file(file: &GisDataFile, shapefile_name: &str) -> ShapefileImportData {
        let mut abstract_text = format!(
            "This shapefile was mapped from the Dataverse file \"{}\" in the dataset \"{}\".",
            file.datafile_label, file.dataset_name,
        );
        if !file.dataset_citation.is_empty() {
            abstract_text.push_str(" Citation: ");
            abstract_text.push_str(&file.dataset_citation);
        }
        ShapefileImportData {
            title: file.datafile_label.clone(),
            abstract_text,
            shapefile_name: shapefile_name.to_owned(),
            dv_user_email: file.dv_user_email.clone(),
        }
    }

    /// Fields sent to WorldMap (before signing).
    pub fn to_params(&self) -> FormData {
        let mut params = FormData::new();
        params.insert("title".to_owned(), self.title.clone());
        params.insert("abstract".to_owned(), self.abstract_text.clone());
        params.insert("shapefile_name".to_owned(), self.shapefile_name.clone());
        params.insert("dv_user_email".to_owned(), self.dv_user_email.clone());
        params
    }
}

/// Column choices for mapping a table by latitude and longitude.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LatLngColumns {
    /// The tabular file being mapped.
    pub tabular_file_info_id: i32,
    /// Latitude column.
    pub latitude: String,
    /// Longitude column.
    pub longitude: String,
}

impl LatLngColumns {
    /// Validate against the columns we actually found in the file.
    pub fn validate(data: &FormData, column_names: &[String]) -> Result<LatLngColumns, FormErrors> {
        let choices = column_choices(column_names);
        let mut f = Fields::new(data);
        let tabular_file_info_id = f.required_int("tabular_file_info_id");
        let latitude = f.choice("latitude", &choices);
        let longitude = f.choice("longitude", &choices);
        if !latitude.is_empty() && latitude == longitude {
            f.errors.add(
                "longitude",
                "The Longitude column cannot be the same as the Latitude column.",
            );
        }
        f.errors.finish(|| LatLngColumns {
            tabular_file_info_id,
            latitude,
            longitude,
        })
    }
}

/// A join column and the WorldMap join target to join it to.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChooseSingleColumn {
    /// The tabular file being mapped.
    pub tabular_file_info_id: i32,
    /// The WorldMap join target ID.
    pub chosen_layer: i32,
    /// Column in our table.
    pub chosen_column: String,
}

impl ChooseSingleColumn {
    /// Validate against the columns we found in the file.
    pub fn validate(
        data: &FormData,
        column_names: &[String],
    ) -> Result<ChooseSingleColumn, FormErrors> {
        let choices = column_choices(column_names);
        let mut f = Fields::new(data);
        let tabular_file_info_id = f.required_int("tabular_file_info_id");
        let chosen_layer = match f.optional("chosen_layer") {
            None => {
                f.errors.add("chosen_layer", "You must choose a layer");
                0
            }
            Some(value) => value.parse::<i32>().unwrap_or_else(|_| {
                f.errors.add(
                    "chosen_layer",
                    "The layer does not have a valid id. (talk to the admin)",
                );
                0
            }),
        };
        let chosen_column = f.choice("chosen_column", &choices);
        f.errors.finish(|| ChooseSingleColumn {
            tabular_file_info_id,
            chosen_layer,
            chosen_column,
        })
    }
}

fn column_choices(column_names: &[String]) -> Vec<String> {
    column_names
        .iter()
        .filter(|c| !c.is_empty())
        .cloned()
        .collect()
}

/// A classification method WorldMap understands.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ClassifyMethod {
    /// Our form value.
    pub id: u32,
    /// Shown to people.
    pub display_name: &'static str,
    /// Sent to WorldMap.
    pub value_name: &'static str,
}

/// Every classification method we offer.
pub const CLASSIFY_METHODS: &[ClassifyMethod] = &[
    ClassifyMethod {
        id: 1,
        display_name: "Equal Interval",
        value_name: "equal",
    },
    ClassifyMethod {
        id: 2,
        display_name: "Quantile",
        value_name: "quantile",
    },
    ClassifyMethod {
        id: 3,
        display_name: "Jenks",
        value_name: "jenks",
    },
    ClassifyMethod {
        id: 4,
        display_name: "Unique Values",
        value_name: "unique",
    },
];

/// A color ramp.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ColorRamp {
    /// Shown to people and sent to WorldMap.
    pub name: &'static str,
    /// First color in the ramp.
    pub start_color: &'static str,
    /// Last color in the ramp.
    pub end_color: &'static str,
}

/// Every color ramp we offer.
pub const COLOR_RAMPS: &[ColorRamp] = &[
    ColorRamp {
        name: "Blue",
        start_color: "#f7fbff",
        end_color: "#08306b",
    },
    ColorRamp {
        name: "Red",
        start_color: "#fff5f0",
        end_color: "#67000d",
    },
    ColorRamp {
        name: "Orange",
        start_color: "#fff5eb",
        end_color: "#7f2704",
    },
    ColorRamp {
        name: "Jet",
        start_color: "#0000ff",
        end_color: "#ff0000",
    },
];

/// Smallest and largest number of classification intervals.
pub const INTERVAL_RANGE: (u32, u32) = (1, 20);

/// A request to restyle a layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassifyLayer {
    /// The WorldMap layer name.
    pub layer_name: String,
    /// Attribute (column) name.
    pub attribute: String,
    /// The attribute's type, as reported by WorldMap.
    pub attribute_type: String,
    /// How to classify.
    pub method: ClassifyMethod,
    /// How many classes.
    pub intervals: u32,
    /// Which colors.
    pub ramp: ColorRamp,
    /// Reverse the ramp?
    pub reverse: bool,
}

impl ClassifyLayer {
    /// Validate submitted fields. `attributes` holds the `name|type` choices
    /// built from the layer's attribute info.
    pub fn validate(data: &FormData, attributes: &[String]) -> Result<ClassifyLayer, FormErrors> {
        let mut f = Fields::new(data);
        let layer_name = f.required("layer_name");

        let raw_attribute = f.choice("attribute", attributes);
        let mut parts = raw_attribute.splitn(2, ATTRIBUTE_VALUE_DELIMITER);
        let attribute = parts.next().unwrap_or_default().to_owned();
        let attribute_type = parts.next().unwrap_or_default().to_owned();

        let method_id: u32 = f.required_int("method");
        let method = CLASSIFY_METHODS.iter().find(|m| m.id == method_id).copied();
        if method.is_none() && !f.errors.has("method") {
            f.errors.add(
                "method",
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    method_id
                ),
            );
        }

        let intervals: u32 = f.required_int("intervals");
        let (lo, hi) = INTERVAL_RANGE;
        if !f.errors.has("intervals") && (intervals < lo || intervals > hi) {
            f.errors.add(
                "intervals",
                format!("Ensure this value is between {} and {}.", lo, hi),
            );
        }

        let ramp_names = COLOR_RAMPS
            .iter()
            .map(|r| r.name.to_owned())
            .collect::<Vec<_>>();
        let ramp_name = f.choice("ramp", &ramp_names);
        let ramp = COLOR_RAMPS.iter().find(|r| r.name == ramp_name).copied();
        let reverse = f.checkbox("reverse");

        match (method, ramp) {
            (Some(method), Some(ramp)) if f.errors.is_empty() => Ok(ClassifyLayer {
                layer_name,
                attribute,
                attribute_type,
                method,
                intervals,
                ramp,
                reverse,
            }),
            _ => Err(f.errors),
        }
    }

    /// Fields sent to WorldMap (before signing).
    pub fn to_params(&self) -> FormData {
        let mut params = FormData::new();
        params.insert("layer_name".to_owned(), self.layer_name.clone());
        params.insert("attribute".to_owned(), self.attribute.clone());
        params.insert("method".to_owned(), self.method.value_name.to_owned());
        params.insert("intervals".to_owned(), self.intervals.to_string());
        params.insert("ramp".to_owned(), self.ramp.name.to_owned());
        params.insert("startColor".to_owned(), self.ramp.start_color.to_owned());
        params.insert("endColor".to_owned(), self.ramp.end_color.to_owned());
        params.insert("reverse".to_owned(), self.reverse.to_string());
        params
    }
}

/// Build `name|type` attribute choices from a layer's `attribute_info`.
pub fn attribute_choices(attribute_info: &Value) -> Vec<String> {
    attribute_info
        .as_array()
        .map(|attrs| {
            attrs
                .iter()
                .filter_map(|attr| {
                    let name = attr.get("name")?.as_str()?;
                    let ty = attr.get("type").and_then(|t| t.as_str()).unwrap_or("");
                    Some(format!("{}{}{}", name, ATTRIBUTE_VALUE_DELIMITER, ty))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Confirmation that someone really wants to delete a map.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeleteMapConfirmation {
    /// The data file the map came from.
    pub gis_data_file_md5: String,
    /// The layer to delete.
    pub worldmap_layer_info_md5: String,
}

impl DeleteMapConfirmation {
    /// Validate submitted fields.
    pub fn validate(data: &FormData) -> Result<DeleteMapConfirmation, FormErrors> {
        let mut f = Fields::new(data);
        let gis_data_file_md5 = f.required("gis_data_file_md5");
        let worldmap_layer_info_md5 = f.required("worldmap_layer_info_md5");
        if !f.checkbox("confirmation") {
            f.errors.add("confirmation", REQUIRED);
        }
        f.errors.finish(|| DeleteMapConfirmation {
            gis_data_file_md5,
            worldmap_layer_info_md5,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> FormData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_import_fields_render_like_django() {
        let errors = ShapefileImportData::validate(&data(&[])).unwrap_err();
        assert_eq!(
            errors.as_ul(),
            "<ul class=\"errorlist\"><li>abstract<ul class=\"errorlist\"><li>This field is required.</li></ul></li><li>dv_user_email<ul class=\"errorlist\"><li>This field is required.</li></ul></li><li>shapefile_name<ul class=\"errorlist\"><li>This field is required.</li></ul></li><li>title<ul class=\"errorlist\"><li>This field is required.</li></ul></li></ul>"
        );
    }

    #[test]
    fn one_missing_field_gives_one_error() {
        let errors = ShapefileImportData::validate(&data(&[
            ("abstract", "About poverty"),
            ("shapefile_name", "poverty.zip"),
            ("dv_user_email", "user@example.edu"),
            ("title", "   "),
        ]))
        .unwrap_err();
        assert_eq!(errors.get("title"), &[REQUIRED.to_owned()]);
        assert_eq!(errors.first_message(), Some(REQUIRED));
        assert!(!errors.has("abstract"));
    }

    #[test]
    fn lat_lng_columns_must_differ() {
        let columns = vec!["lat".to_owned(), "lng".to_owned(), "".to_owned()];
        let errors = LatLngColumns::validate(
            &data(&[
                ("tabular_file_info_id", "3"),
                ("latitude", "lat"),
                ("longitude", "lat"),
            ]),
            &columns,
        )
        .unwrap_err();
        assert_eq!(
            errors.get("longitude"),
            &["The Longitude column cannot be the same as the Latitude column.".to_owned()]
        );

        let ok = LatLngColumns::validate(
            &data(&[
                ("tabular_file_info_id", "3"),
                ("latitude", "lat"),
                ("longitude", "lng"),
            ]),
            &columns,
        )
        .unwrap();
        assert_eq!(ok.tabular_file_info_id, 3);
        assert_eq!(ok.longitude, "lng");
    }

    #[test]
    fn chosen_layer_must_be_an_integer() {
        let columns = vec!["tract".to_owned()];
        let errors = ChooseSingleColumn::validate(
            &data(&[
                ("tabular_file_info_id", "1"),
                ("chosen_layer", "boston"),
                ("chosen_column", "tract"),
            ]),
            &columns,
        )
        .unwrap_err();
        assert_eq!(
            errors.get("chosen_layer"),
            &["The layer does not have a valid id. (talk to the admin)".to_owned()]
        );

        let errors = ChooseSingleColumn::validate(
            &data(&[("tabular_file_info_id", "1"), ("chosen_column", "zip")]),
            &columns,
        )
        .unwrap_err();
        assert_eq!(errors.get("chosen_layer"), &["You must choose a layer".to_owned()]);
        assert!(errors.has("chosen_column"));
    }

    #[test]
    fn classify_layer_checks_ranges_and_splits_attributes() {
        let attrs = attribute_choices(&serde_json::json!([
            {"name": "income", "type": "xsd:int"},
            {"name": "name", "type": "xsd:string"},
        ]));
        assert_eq!(attrs, vec!["income|xsd:int", "name|xsd:string"]);

        let form = ClassifyLayer::validate(
            &data(&[
                ("layer_name", "geonode:income"),
                ("attribute", "income|xsd:int"),
                ("method", "2"),
                ("intervals", "5"),
                ("ramp", "Blue"),
                ("reverse", "on"),
            ]),
            &attrs,
        )
        .unwrap();
        assert_eq!(form.attribute, "income");
        assert_eq!(form.attribute_type, "xsd:int");
        let params = form.to_params();
        assert_eq!(params["method"], "quantile");
        assert_eq!(params["reverse"], "true");
        assert_eq!(params["startColor"], "#f7fbff");

        let errors = ClassifyLayer::validate(
            &data(&[
                ("layer_name", "geonode:income"),
                ("attribute", "income|xsd:int"),
                ("method", "9"),
                ("intervals", "21"),
                ("ramp", "Plaid"),
            ]),
            &attrs,
        )
        .unwrap_err();
        assert!(errors.has("method"));
        assert!(errors.has("intervals"));
        assert!(errors.has("ramp"));
    }

    #[test]
    fn dataverse_info_requires_numbers_and_email() {
        let errors = DataverseInfo::validate(&data(&[
            ("dv_user_id", "abc"),
            ("dv_user_email", "not-an-email"),
        ]))
        .unwrap_err();
        assert_eq!(errors.get("dv_user_id"), &["Enter a whole number.".to_owned()]);
        assert_eq!(
            errors.get("dv_user_email"),
            &["Enter a valid email address.".to_owned()]
        );
        assert_eq!(errors.get("dataset_id"), &[REQUIRED.to_owned()]);
    }

    #[test]
    fn delete_requires_confirmation() {
        let errors = DeleteMapConfirmation::validate(&data(&[
            ("gis_data_file_md5", "abc"),
            ("worldmap_layer_info_md5", "def"),
        ]))
        .unwrap_err();
        assert_eq!(errors.get("confirmation"), &[REQUIRED.to_owned()]);

        let ok = DeleteMapConfirmation::validate(&data(&[
            ("gis_data_file_md5", "abc"),
            ("worldmap_layer_info_md5", "def"),
            ("confirmation", "on"),
        ]))
        .unwrap();
        assert_eq!(ok.worldmap_layer_info_md5, "def");
    }
}
