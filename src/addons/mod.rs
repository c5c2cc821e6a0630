// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Optional capabilities attached to tenant control planes.

pub mod konnectivity;
