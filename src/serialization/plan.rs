use std::path::Path;

use log::{info, warn};
use sqlite::OpenFlags;

use crate::{
    graph::RoadGraph,
    primitives::{set_new, Meters},
    solve::StationPlan,
    trips::Trip,
};

#[derive(Debug)]
pub enum ExportPlanError {
    OutputExists,
    Sqlite(sqlite::Error),
    /// SQLite integers are signed.
    DistanceOutOfRange { trip_idx: usize, distance: Meters },
}

impl From<sqlite::Error> for ExportPlanError {
    fn from(err: sqlite::Error) -> Self {
        ExportPlanError::Sqlite(err)
    }
}

/// Writes the road nodes, the opened stations and, per trip, its refueling stops.
/// Never touches an existing file. A file left incomplete by an error is removed.
pub fn export_plan(
    graph: &RoadGraph,
    trips: &[Trip],
    plan: &StationPlan,
    out_filename: &str,
) -> Result<(), ExportPlanError> {
    if Path::new(out_filename).exists() {
        return Err(ExportPlanError::OutputExists);
    }
    info!("Exporting plan to {}...", out_filename);
    let result = write_plan(graph, trips, plan, out_filename);
    if result.is_err() {
        if let Err(err) = std::fs::remove_file(out_filename) {
            warn!("Could not remove incomplete plan {}: {}", out_filename, err);
        }
    }
    result
}

fn write_plan(
    graph: &RoadGraph,
    trips: &[Trip],
    plan: &StationPlan,
    out_filename: &str,
) -> Result<(), ExportPlanError> {
    let connection = sqlite::Connection::open_with_flags(
        out_filename,
        OpenFlags::default()
            .with_create()
            .with_no_mutex()
            .with_read_write(),
    )?;
    connection.execute("BEGIN TRANSACTION;")?;

    connection.execute(
        "
        CREATE TABLE node (
            id INTEGER PRIMARY KEY NOT NULL,
            label TEXT NOT NULL,
            station INTEGER NOT NULL
        );",
    )?;
    connection.execute(
        "
        CREATE TABLE trip (
            id INTEGER PRIMARY KEY NOT NULL,
            origin INTEGER NOT NULL,
            destination INTEGER NOT NULL,
            distance INTEGER NOT NULL
        );",
    )?;
    connection.execute(
        "
        CREATE TABLE trip_stop (
            trip_id INTEGER NOT NULL,
            stop_index INTEGER NOT NULL,
            node_id INTEGER NOT NULL
        );",
    )?;

    let mut stations = set_new();
    stations.extend(plan.stations.iter().copied());
    let mut stmt = connection.prepare("INSERT INTO node (id, label, station) VALUES (?, ?, ?)")?;
    for (id, node) in graph.nodes() {
        stmt.bind((1, id.0 as i64))?;
        stmt.bind((2, &*node.label))?;
        stmt.bind((3, stations.contains(&id) as i64))?;
        stmt.next()?;
        stmt.reset()?;
    }

    let mut stmt_trip = connection
        .prepare("INSERT INTO trip (id, origin, destination, distance) VALUES (?, ?, ?, ?)")?;
    let mut stmt_stop = connection
        .prepare("INSERT INTO trip_stop (trip_id, stop_index, node_id) VALUES (?, ?, ?)")?;
    for (trip_idx, trip) in trips.iter().enumerate() {
        let distance = i64::try_from(trip.distance()).map_err(|_| {
            ExportPlanError::DistanceOutOfRange {
                trip_idx,
                distance: trip.distance(),
            }
        })?;
        stmt_trip.bind((1, trip_idx as i64))?;
        stmt_trip.bind((2, trip.origin.0 as i64))?;
        stmt_trip.bind((3, trip.destination.0 as i64))?;
        stmt_trip.bind((4, distance))?;
        stmt_trip.next()?;
        stmt_trip.reset()?;

        for (stop_index, node_idx) in plan.stops(trip_idx).into_iter().enumerate() {
            stmt_stop.bind((1, trip_idx as i64))?;
            stmt_stop.bind((2, stop_index as i64))?;
            stmt_stop.bind((3, node_idx.0 as i64))?;
            stmt_stop.next()?;
            stmt_stop.reset()?;
        }
    }

    connection.execute("END TRANSACTION;")?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedTrip {
    pub origin: Box<str>,
    pub destination: Box<str>,
    pub distance: Meters,
    pub stops: Vec<Box<str>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedPlan {
    pub stations: Vec<Box<str>>,
    pub trips: Vec<ImportedTrip>,
}

#[derive(Debug)]
pub enum ImportPlanError {
    CouldNotOpen(sqlite::Error),
    Sqlite(sqlite::Error),
    MissingTripIndex { trip_idx: usize, got_index: i64 },
    StopOfUnknownTrip { trip_id: i64 },
    NegativeDistance { trip_idx: usize, distance: i64 },
}

pub fn import_plan(in_fname: &str) -> Result<ImportedPlan, ImportPlanError> {
    info!("Importing plan from {}...", in_fname);
    let connection =
        sqlite::Connection::open_with_flags(in_fname, OpenFlags::default().with_read_only())
            .map_err(ImportPlanError::CouldNotOpen)?;

    let stations = connection
        .prepare("SELECT label FROM node WHERE station = 1 ORDER BY id ASC;")
        .map_err(ImportPlanError::Sqlite)?
        .iter()
        .map(|it| match it {
            Err(it) => Err(ImportPlanError::Sqlite(it)),
            Ok(it) => Ok(it.read::<&str, _>(0).into()),
        })
        .collect::<Result<Vec<Box<str>>, _>>()?;

    let mut trips = connection
        .prepare(
            "SELECT trip.id, o.label, d.label, trip.distance FROM trip \
            JOIN node o ON o.id = trip.origin \
            JOIN node d ON d.id = trip.destination \
            ORDER BY trip.id ASC;",
        )
        .map_err(ImportPlanError::Sqlite)?
        .iter()
        .enumerate()
        .map(|(idx, it)| match it {
            Err(it) => Err(ImportPlanError::Sqlite(it)),
            Ok(it) => {
                let id: i64 = it.read(0);
                if id != idx as i64 {
                    return Err(ImportPlanError::MissingTripIndex {
                        trip_idx: idx,
                        got_index: id,
                    });
                }
                let distance: i64 = it.read(3);
                Ok(ImportedTrip {
                    origin: it.read::<&str, _>(1).into(),
                    destination: it.read::<&str, _>(2).into(),
                    distance: Meters::try_from(distance).map_err(|_| {
                        ImportPlanError::NegativeDistance {
                            trip_idx: idx,
                            distance,
                        }
                    })?,
                    stops: vec![],
                })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let stops = connection
        .prepare(
            "SELECT trip_stop.trip_id, node.label FROM trip_stop \
            JOIN node ON node.id = trip_stop.node_id \
            ORDER BY trip_stop.trip_id ASC, trip_stop.stop_index ASC;",
        )
        .map_err(ImportPlanError::Sqlite)?
        .iter()
        .map(|it| match it {
            Err(it) => Err(ImportPlanError::Sqlite(it)),
            Ok(it) => Ok((it.read::<i64, _>(0), Box::<str>::from(it.read::<&str, _>(1)))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    for (trip_id, label) in stops {
        trips
            .get_mut(trip_id as usize)
            .ok_or(ImportPlanError::StopOfUnknownTrip { trip_id })?
            .stops
            .push(label);
    }

    Ok(ImportedPlan { stations, trips })
}
