//! Writes the JSON schema of Phrasebook's configuration file to
//! `schema.json` at build time. There is no code in here.
