//! Prompt material for the fused health + irrigation call.

use sprout_schema::{SensorReading, WeatherForecast};

use crate::context::PotContext;

/// Combined system instructions: health scale, the closed reasons
/// vocabulary, and the exact output schema the validator expects.
pub const SYSTEM_PROMPT: &str = r#"You are an outdoor plant assistant with two tasks:

(1) Plant Health Assessment
(2) Irrigation Recommendation

You will receive:
- 1 plant photo (image input)
- plant_name: scientific name of the plant species
- pot_diameter: pot diameter (cm)
- pot_height: pot height (cm)
- soil_moisture_percent: soil moisture (0-100)
- light_lux: light level (lux)
- soil_temperature_c: soil temperature (C)
- air_temperature_c: air temperature (C)
- air_humidity_percent: air humidity (0-100%)
- will_rain_next_24h: expected rain in next 24h (true/false)
- rain_mm_next_24h: expected rainfall (mm)
- max_temp_next_24h_c: max air temp next 24h (C)

========================
Task (1): Health Assessment
========================

Carefully inspect the plant image for visual signs of health or stress.
Combine image + plant_name + sensor data to judge health.

Health scale:
- 5 = healthy
- 4 = minor_issue
- 3 = slightly_unhealthy
- 2 = warning
- 1 = critical

For "reasons", you MUST output only short standardized tags from the following fixed list:

- need more light
- need less light
- light inconsistent
- drainage issue
- temperature too high
- temperature too low
- temperature fluctuating
- pest suspected
- disease suspected
- fungus suspected
- need pruning
- nutrient deficiency suspected
- overgrowth
- weak growth
- environmental stress
- uncertain assessment
- healthy

Rules for "reasons":
- Use 1-4 tags.
- Only use tags from this list.
- Do not invent new words or phrases.
- Do not explain the tags.
- If the plant is healthy, you may output exactly ["healthy"].

========================
Task (2): Irrigation Recommendation
========================

Use plant_name, pot size, soil_moisture_percent, light, temperature, humidity and 24h weather forecast.

Your task:
1. Decide whether the plant should be watered now.
2. If watering is needed, estimate water_ml (milliliters).
3. Suggest a target soil moisture range after watering.

========================
OUTPUT FORMAT (VERY IMPORTANT)
========================

Respond ONLY with ONE JSON object with EXACTLY TWO top-level keys:

{
  "health": {
    "health_level": integer 1-5,
    "reasons": array of 1-4 short tags (from the fixed list),
    "suggestions": array of 2-5 short English sentences
  },
  "irrigation": {
    "should_water": true or false,
    "water_ml": integer (0 if no watering is needed),
    "target_soil_moisture_percent_min": integer,
    "target_soil_moisture_percent_max": integer,
    "note": a very short English explanation (max 25 words)
  }
}

Rules:
- DO NOT add any extra keys at any level.
- DO NOT include any extra text outside the JSON.
"#;

/// The text half of the request: exactly these eleven fields, in this
/// order, one per line. The validator's contract with the model depends on
/// this block staying stable.
pub fn context_block(
    plant_name: &str,
    pot: &PotContext,
    reading: &SensorReading,
    forecast: &WeatherForecast,
) -> String {
    format!(
        "plant_name: {plant_name}\n\
         pot_diameter: {pot_diameter}\n\
         pot_height: {pot_height}\n\
         soil_moisture_percent: {soil_moisture}\n\
         will_rain_next_24h: {will_rain}\n\
         rain_mm_next_24h: {rain_mm}\n\
         max_temp_next_24h_c: {max_temp}\n\
         light_lux: {light_lux}\n\
         soil_temperature_c: {soil_temp}\n\
         air_temperature_c: {air_temp}\n\
         air_humidity_percent: {air_humidity}\n",
        pot_diameter = pot.pot_diameter,
        pot_height = pot.pot_height,
        soil_moisture = reading.soil_moisture_percent,
        will_rain = forecast.will_rain_next_24h,
        rain_mm = forecast.rain_mm_next_24h,
        max_temp = forecast.max_temp_next_24h_c,
        light_lux = reading.light_lux,
        soil_temp = reading.soil_temperature_c,
        air_temp = reading.air_temperature_c,
        air_humidity = reading.air_humidity_percent,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (PotContext, SensorReading, WeatherForecast) {
        (
            PotContext {
                pot_diameter: 18.0,
                pot_height: 20.0,
                latitude: "59.91".into(),
                longitude: "10.75".into(),
            },
            SensorReading {
                timestamp: "2025-03-01T08:00:00".into(),
                date: Some("2025-03-01".into()),
                soil_moisture_percent: 31.0,
                light_lux: 900.0,
                soil_temperature_c: 18.0,
                air_temperature_c: 21.0,
                air_humidity_percent: 50.0,
            },
            WeatherForecast {
                will_rain_next_24h: true,
                rain_mm_next_24h: 3.0,
                max_temp_next_24h_c: 27.0,
            },
        )
    }

    #[test]
    fn block_has_exactly_eleven_fields_in_order() {
        let (pot, reading, forecast) = fixture();
        let block = context_block("Ficus lyrata", &pot, &reading, &forecast);
        let keys: Vec<&str> = block
            .lines()
            .map(|line| line.split(':').next().unwrap())
            .collect();
        assert_eq!(
            keys,
            vec![
                "plant_name",
                "pot_diameter",
                "pot_height",
                "soil_moisture_percent",
                "will_rain_next_24h",
                "rain_mm_next_24h",
                "max_temp_next_24h_c",
                "light_lux",
                "soil_temperature_c",
                "air_temperature_c",
                "air_humidity_percent",
            ]
        );
    }

    #[test]
    fn block_renders_values() {
        let (pot, reading, forecast) = fixture();
        let block = context_block("Ficus lyrata", &pot, &reading, &forecast);
        assert!(block.contains("plant_name: Ficus lyrata"));
        assert!(block.contains("will_rain_next_24h: true"));
        assert!(block.contains("rain_mm_next_24h: 3"));
        assert!(block.contains("soil_moisture_percent: 31"));
    }

    #[test]
    fn system_prompt_pins_vocabulary_and_schema() {
        for tag in sprout_schema::REASON_TAGS {
            assert!(SYSTEM_PROMPT.contains(tag), "missing tag: {tag}");
        }
        assert!(SYSTEM_PROMPT.contains("target_soil_moisture_percent_min"));
        assert!(SYSTEM_PROMPT.contains("EXACTLY TWO top-level keys"));
    }
}
