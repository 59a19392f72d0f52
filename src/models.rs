use serde::{Deserialize, Serialize};

/// Boundary table name / 行政区划表名
pub const BOUNDARY_TABLE: &str = "administrative_boundaries";

/// Native-script name columns, indexed individually / 本地语言名称列
pub const NATIVE_NAME_COLUMNS: [&str; 3] = ["name1", "name2", "name3"];

/// English name columns / 英文名称列
pub const LATIN_NAME_COLUMNS: [&str; 3] = ["name_eng1", "name_eng2", "name_eng3"];

/// All six name fields joined by spaces.
/// The trigram index and the substring search must use this exact expression
/// for the planner to pick the index.
pub const NAME_CONCAT_EXPR: &str = "name1 || ' ' || name2 || ' ' || name3 || ' ' || \
     name_eng1 || ' ' || name_eng2 || ' ' || name_eng3";

/// Select list for [`AdministrativeBoundary`]. NULLs come back as empty text or zero.
pub const BOUNDARY_COLUMNS: &str = r#"
    objectid::int8 AS objectid,
    COALESCE(admin_id1::text, '') AS admin_id1,
    COALESCE(admin_id2::text, '') AS admin_id2,
    COALESCE(admin_id3::text, '') AS admin_id3,
    COALESCE(name1::text, '') AS name1,
    COALESCE(name_eng1::text, '') AS name_eng1,
    COALESCE(name2::text, '') AS name2,
    COALESCE(name_eng2::text, '') AS name_eng2,
    COALESCE(name3::text, '') AS name3,
    COALESCE(name_eng3::text, '') AS name_eng3,
    COALESCE("type", 0)::int4 AS "type",
    COALESCE(version::text, '') AS version,
    COALESCE(pop_year, 0)::int4 AS pop_year,
    COALESCE(population, 0)::float8 AS population,
    COALESCE(male, 0)::float8 AS male,
    COALESCE(female, 0)::float8 AS female,
    COALESCE(house, 0)::float8 AS house,
    COALESCE(shape__area, 0)::float8 AS shape__area,
    COALESCE(shape__length, 0)::float8 AS shape__length
"#;

/// One administrative unit / 行政区划单元
///
/// JSON keys keep the upper-case names the public API has always returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "UPPERCASE")]
pub struct AdministrativeBoundary {
    pub objectid: i64,
    pub admin_id3: String,
    pub name1: String,
    pub name_eng1: String,
    pub name2: String,
    pub name_eng2: String,
    pub name3: String,
    pub name_eng3: String,
    pub admin_id1: String,
    pub admin_id2: String,
    #[serde(rename = "Type")]
    #[sqlx(rename = "type")]
    pub boundary_type: i32,
    #[serde(rename = "Version")]
    pub version: String,
    pub pop_year: i32,
    pub population: f64,
    pub male: f64,
    pub female: f64,
    pub house: f64,
    #[serde(rename = "Shape_Area")]
    #[sqlx(rename = "shape__area")]
    pub shape_area: f64,
    #[serde(rename = "Shape_Length")]
    #[sqlx(rename = "shape__length")]
    pub shape_length: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AdministrativeBoundary {
        AdministrativeBoundary {
            objectid: 7,
            admin_id3: "TH100101".to_string(),
            name1: "กรุงเทพมหานคร".to_string(),
            name_eng1: "Bangkok".to_string(),
            name2: "พระนคร".to_string(),
            name_eng2: "Phra Nakhon".to_string(),
            name3: "พระบรมมหาราชวัง".to_string(),
            name_eng3: "Phra Borom Maha Ratchawang".to_string(),
            admin_id1: "TH10".to_string(),
            admin_id2: "TH1001".to_string(),
            boundary_type: 3,
            version: "2020".to_string(),
            pop_year: 2019,
            population: 3361.0,
            male: 1600.0,
            female: 1761.0,
            house: 900.0,
            shape_area: 0.0002,
            shape_length: 0.07,
        }
    }

    #[test]
    fn test_json_keys() {
        let value = serde_json::to_value(sample()).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "OBJECTID", "ADMIN_ID1", "ADMIN_ID2", "ADMIN_ID3", "NAME1", "NAME_ENG1", "NAME2",
            "NAME_ENG2", "NAME3", "NAME_ENG3", "Type", "Version", "POP_YEAR", "POPULATION",
            "MALE", "FEMALE", "HOUSE", "Shape_Area", "Shape_Length",
        ] {
            assert!(obj.contains_key(key), "missing key {}", key);
        }
        assert_eq!(obj.len(), 19);
        assert_eq!(obj["NAME_ENG1"], "Bangkok");
        assert_eq!(obj["Type"], 3);
    }
}
