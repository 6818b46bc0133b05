mod interop;
mod pairwise;
mod providers;
mod rfc;
mod telemetry;
