//! Weather-file translation functions
//!
//! Each function wraps one `ladybug translate` subcommand. The conversion
//! itself (EPW parsing, design-day percentiles, timestep interpolation)
//! happens inside the tool; these declarations only say which files go in,
//! which flags are passed and which file comes out.

use crate::error::WxError;
use crate::function::{Function, InputSpec, OutputSpec};

/// Translate an .epw file to a .wea file
pub fn epw_to_wea() -> Result<Function, WxError> {
    Function::builder("epw-to-wea")
        .description("Translate an .epw file to a .wea file.")
        .input(
            InputSpec::file("epw", "Weather file.", "weather.epw")
                .map(|i| i.with_extensions(["epw"])),
        )
        .input(
            InputSpec::string(
                "period",
                "An AnalysisPeriod string to filter the datetimes in the resulting Wea \
                 (eg. \"6/21 to 9/21 between 8 and 16 @1\"). Note that the timestep of the \
                 analysis period should match the input timestep and a * must be at the end \
                 of the string if the input epw is for a leap year. If None, the Wea will be \
                 annual.",
            )
            .map(|i| i.with_default("")),
        )
        .input(
            InputSpec::int(
                "timestep",
                "An integer to set the number of time steps per hour. Default is 1 for one \
                 value per hour. Note that this input will only do a linear interpolation \
                 over the data in the epw file.",
            )
            .map(|i| i.with_default(1i64)),
        )
        .command(
            "ladybug translate epw-to-wea weather.epw \
             --analysis-period \"{{self.period}}\" --timestep {{self.timestep}} \
             --output-file weather.wea",
        )
        .output(OutputSpec::file(
            "wea",
            "A wea file generated from the input epw.",
            "weather.wea",
        ))
        .build()
}

/// Translate an .epw file to a .ddy file
pub fn epw_to_ddy() -> Result<Function, WxError> {
    Function::builder("epw-to-ddy")
        .description("Translate an .epw file to a .ddy file.")
        .input(
            InputSpec::file("epw", "Weather file.", "weather.epw")
                .map(|i| i.with_extensions(["epw"])),
        )
        .input(
            // 0-50 is documented, not enforced; the tool rejects bad values itself
            InputSpec::float(
                "percentile",
                "A number between 0 and 50 for the percentile difference from the most \
                 extreme conditions within the EPW to be used for the design day. Typical \
                 values are 0.4 and 1.0.",
            )
            .map(|i| i.with_default(0.4)),
        )
        .command(
            "ladybug translate epw-to-ddy weather.epw \
             --percentile {{self.percentile}} --output-file weather.ddy",
        )
        .output(OutputSpec::file(
            "ddy",
            "A ddy file generated from the input epw.",
            "weather.ddy",
        ))
        .build()
}

/// Convert a Wea file to have a constant value for each datetime
///
/// Useful when hourly irradiance is irrelevant and the Wea only carries
/// location and datetime information (eg. for direct sun hours).
pub fn wea_to_constant() -> Result<Function, WxError> {
    Function::builder("wea-to-constant")
        .description(
            "Convert a Wea file to have a constant value for each datetime. This is useful \
             in workflows where hourly irradiance values are inconsequential to the analysis \
             and one is only using the Wea as a format to pass location and datetime \
             information (eg. for direct sun hours).",
        )
        .input(
            InputSpec::file(
                "wea",
                "Wea file with irradiance values to be set to constant.",
                "weather.wea",
            )
            .map(|i| i.with_extensions(["wea"])),
        )
        .input(
            InputSpec::int(
                "value",
                "The direct and diffuse irradiance value that will be written in for all \
                 datetimes of the Wea.",
            )
            .map(|i| i.with_default(1000i64)),
        )
        .command(
            "ladybug translate wea-to-constant weather.wea \
             --value {{self.value}} --output-file constant.wea",
        )
        .output(OutputSpec::file(
            "constant-wea",
            "A wea file with constant irradiance values for each datetime.",
            "constant.wea",
        ))
        .build()
}

/// All translation functions, in declaration order
pub fn builtin() -> Result<Vec<Function>, WxError> {
    Ok(vec![epw_to_wea()?, epw_to_ddy()?, wea_to_constant()?])
}
