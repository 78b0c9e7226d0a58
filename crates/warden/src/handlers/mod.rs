//! Request handlers, grouped the way routes are.

pub mod testgrp;
pub mod usergrp;
