pub mod macros;

crate::agg_mod![config, db, models, telemetry, utils];
