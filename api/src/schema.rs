use ::serde::{Deserialize, Deserializer, Serialize};

use crate::prediction::PredictionRequest;

#[derive(Debug, Deserialize, Serialize)]
pub struct NextDayPredictionInput {
    pub menu_name: String,
    #[serde(deserialize_with = "whole_number")]
    pub last_day_quantity: i64,
    #[serde(deserialize_with = "whole_number")]
    pub today_day_of_week: i64, // 0=Monday, 6=Sunday
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SameDayPredictionInput {
    pub menu_name: String,
    #[serde(deserialize_with = "whole_number")]
    pub prev_day_sales: i64,
    #[serde(deserialize_with = "whole_number")]
    pub day_of_week: i64, // day being predicted
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrFloat {
    Int(i64),
    Float(f64),
}

// clients built on float-only number types send 4.0 for 4
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match IntOrFloat::deserialize(deserializer)? {
        IntOrFloat::Int(v) => Ok(v),
        IntOrFloat::Float(v)
            if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 =>
        {
            Ok(v as i64)
        }
        IntOrFloat::Float(v) => Err(serde::de::Error::custom(format!(
            "expected a whole number, got {}",
            v
        ))),
    }
}

impl From<NextDayPredictionInput> for PredictionRequest {
    fn from(input: NextDayPredictionInput) -> Self {
        PredictionRequest {
            menu_name: input.menu_name,
            reference_day_sales: input.last_day_quantity,
            reference_day_of_week: input.today_day_of_week,
        }
    }
}

impl From<SameDayPredictionInput> for PredictionRequest {
    fn from(input: SameDayPredictionInput) -> Self {
        PredictionRequest {
            menu_name: input.menu_name,
            reference_day_sales: input.prev_day_sales,
            reference_day_of_week: input.day_of_week,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NextDayPredictionOutput {
    pub predicted_quantity: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SameDayPredictionOutput {
    pub message: String,
    pub predicted_quantity: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DetailBody {
    pub detail: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RootMessage {
    pub message: String,
}
