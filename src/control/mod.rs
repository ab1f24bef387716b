//! External control surfaces (§6): the interactive menu, UDP song ingress,
//! and file-based UDP emulation. Explicitly named as "external, not in the
//! core" by §1/§6 — none of this is on the real-time path.

pub mod menu;
pub mod udp;
